/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Session events raised by the page-side WebXR driver and forwarded to the
//! callbacks the managed side registers with [`set_webxr_events`].

#![allow(unsafe_code)]

use std::ffi::{CStr, CString, c_char};

use euclid::{Point2D, Rect, Size2D};
use parking_lot::RwLock;
use webxr_bridge_api::Pixels;

/// `(views_count, left x, y, w, h, right x, y, w, h)`
pub type SessionStartCallback = extern "C" fn(i32, f32, f32, f32, f32, f32, f32, f32, f32);
pub type SessionEndCallback = extern "C" fn();
pub type StringCallback = extern "C" fn(*const c_char);

/// The managed side's handlers. A missing handler drops its events.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionEventCallbacks {
    pub on_start_ar: Option<SessionStartCallback>,
    pub on_start_vr: Option<SessionStartCallback>,
    pub on_end_xr: Option<SessionEndCallback>,
    pub on_xr_capabilities: Option<StringCallback>,
    pub on_webxr_data: Option<StringCallback>,
}

static CALLBACKS: RwLock<SessionEventCallbacks> = parking_lot::const_rwlock(SessionEventCallbacks {
    on_start_ar: None,
    on_start_vr: None,
    on_end_xr: None,
    on_xr_capabilities: None,
    on_webxr_data: None,
});

/// The browser viewports of the two eyes when a session starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionViewports {
    pub views_count: i32,
    pub left: Rect<f32, Pixels>,
    pub right: Rect<f32, Pixels>,
}

impl SessionViewports {
    fn from_raw(views_count: i32, left: [f32; 4], right: [f32; 4]) -> SessionViewports {
        let rect = |r: [f32; 4]| Rect::new(Point2D::new(r[0], r[1]), Size2D::new(r[2], r[3]));
        SessionViewports {
            views_count,
            left: rect(left),
            right: rect(right),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    StartAr(SessionViewports),
    StartVr(SessionViewports),
    EndXr,
    /// JSON describing what the browser's XR display supports.
    Capabilities(String),
    /// JSON snapshot of controllers and hands.
    WebXrData(String),
}

pub fn register(callbacks: SessionEventCallbacks) {
    *CALLBACKS.write() = callbacks;
}

pub fn unregister() {
    register(SessionEventCallbacks::default());
}

fn forward_start(callback: Option<SessionStartCallback>, name: &str, viewports: &SessionViewports) {
    let Some(callback) = callback else {
        log::warn!("Dropping {name}: no callback registered");
        return;
    };
    let (left, right) = (viewports.left, viewports.right);
    callback(
        viewports.views_count,
        left.origin.x,
        left.origin.y,
        left.size.width,
        left.size.height,
        right.origin.x,
        right.origin.y,
        right.size.width,
        right.size.height,
    );
}

fn forward_string(callback: Option<StringCallback>, name: &str, value: &str) {
    let Some(callback) = callback else {
        log::warn!("Dropping {name}: no callback registered");
        return;
    };
    match CString::new(value) {
        Ok(value) => callback(value.as_ptr()),
        Err(_) => log::warn!("Dropping {name}: payload has an interior NUL"),
    }
}

/// Forward `event` to its registered callback.
pub fn dispatch(event: &SessionEvent) {
    // Copy the table out so a callback may re-register without deadlocking.
    let callbacks = *CALLBACKS.read();
    log::debug!("Session event {event:?}");
    match event {
        SessionEvent::StartAr(viewports) => {
            forward_start(callbacks.on_start_ar, "on_start_ar", viewports)
        },
        SessionEvent::StartVr(viewports) => {
            forward_start(callbacks.on_start_vr, "on_start_vr", viewports)
        },
        SessionEvent::EndXr => match callbacks.on_end_xr {
            Some(callback) => callback(),
            None => log::warn!("Dropping on_end_xr: no callback registered"),
        },
        SessionEvent::Capabilities(json) => {
            forward_string(callbacks.on_xr_capabilities, "on_xr_capabilities", json)
        },
        SessionEvent::WebXrData(json) => {
            forward_string(callbacks.on_webxr_data, "on_webxr_data", json)
        },
    }
}

/// # Safety
///
/// `value` must be null or a NUL-terminated string valid for the call.
unsafe fn read_string(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

/// Called by the managed side to install its handlers.
#[unsafe(no_mangle)]
pub extern "C" fn set_webxr_events(
    on_start_ar: Option<SessionStartCallback>,
    on_start_vr: Option<SessionStartCallback>,
    on_end_xr: Option<SessionEndCallback>,
    on_xr_capabilities: Option<StringCallback>,
    on_webxr_data: Option<StringCallback>,
) {
    register(SessionEventCallbacks {
        on_start_ar,
        on_start_vr,
        on_end_xr,
        on_xr_capabilities,
        on_webxr_data,
    });
}

#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn on_start_ar(
    views_count: i32,
    left_x: f32,
    left_y: f32,
    left_w: f32,
    left_h: f32,
    right_x: f32,
    right_y: f32,
    right_w: f32,
    right_h: f32,
) {
    dispatch(&SessionEvent::StartAr(SessionViewports::from_raw(
        views_count,
        [left_x, left_y, left_w, left_h],
        [right_x, right_y, right_w, right_h],
    )));
}

#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn on_start_vr(
    views_count: i32,
    left_x: f32,
    left_y: f32,
    left_w: f32,
    left_h: f32,
    right_x: f32,
    right_y: f32,
    right_w: f32,
    right_h: f32,
) {
    dispatch(&SessionEvent::StartVr(SessionViewports::from_raw(
        views_count,
        [left_x, left_y, left_w, left_h],
        [right_x, right_y, right_w, right_h],
    )));
}

#[unsafe(no_mangle)]
pub extern "C" fn on_end_xr() {
    dispatch(&SessionEvent::EndXr);
}

/// # Safety
///
/// `capabilities` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn on_xr_capabilities(capabilities: *const c_char) {
    match unsafe { read_string(capabilities) } {
        Some(json) => dispatch(&SessionEvent::Capabilities(json)),
        None => log::warn!("on_xr_capabilities called with null"),
    }
}

/// # Safety
///
/// `data` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn on_webxr_data(data: *const c_char) {
    match unsafe { read_string(data) } {
        Some(json) => dispatch(&SessionEvent::WebXrData(json)),
        None => log::warn!("on_webxr_data called with null"),
    }
}
