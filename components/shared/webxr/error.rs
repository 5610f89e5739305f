/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can be produced by the bridge providers.
///
/// Every provider entry point reports one of these back to the host, which
/// only distinguishes success from failure.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Error {
    /// The operation needs render targets or a device definition that
    /// have not been set up yet.
    NotReady,
    /// The browser session has not published a views buffer.
    ViewsDataUnavailable,
    /// The published views buffer is shorter than its fixed layout.
    ViewsDataTooShort { len: usize, expected: usize },
    /// The host refused to create a render texture.
    TextureAllocation(String),
    /// The input provider does not handle device events.
    UnsupportedEvent(u32),
    /// A host interface required to register a subsystem is missing.
    MissingInterface(String),
    /// The bridge preferences could not be read.
    InvalidPrefs(String),
    BackendSpecific(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotReady => write!(f, "provider is not ready"),
            Error::ViewsDataUnavailable => write!(f, "views data is unavailable"),
            Error::ViewsDataTooShort { len, expected } => write!(
                f,
                "views data holds {len} floats, expected at least {expected}"
            ),
            Error::TextureAllocation(reason) => {
                write!(f, "render texture allocation failed: {reason}")
            },
            Error::UnsupportedEvent(event_type) => {
                write!(f, "unsupported input event {event_type}")
            },
            Error::MissingInterface(name) => write!(f, "host interface {name} is missing"),
            Error::InvalidPrefs(reason) => write!(f, "invalid preferences: {reason}"),
            Error::BackendSpecific(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for Error {}
