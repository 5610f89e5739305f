/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use webxr_bridge_api::Error;

/// Where a provider is in the host's subsystem lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProviderState {
    Uninitialized,
    Initialized,
    Started,
    Stopped,
    Shutdown,
}

/// The lifecycle protocol shared by the display and tracking providers.
///
/// The host calls these from its lifecycle context, never concurrently with
/// the render-thread or input callbacks. `stop` and `shutdown` may be called
/// more than once.
pub trait Provider {
    fn initialize(&mut self) -> Result<(), Error>;
    fn start(&mut self) -> Result<(), Error>;
    fn stop(&mut self);
    fn shutdown(&mut self);
    fn state(&self) -> ProviderState;
}
