/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::ffi::{CStr, c_char};

use parking_lot::{Mutex, MutexGuard, const_mutex};
use webxr_bridge::events::{self, SessionEvent, SessionEventCallbacks};

#[derive(Clone, Debug, PartialEq)]
enum Received {
    StartAr(i32, [f32; 8]),
    StartVr(i32, [f32; 8]),
    EndXr,
    Capabilities(String),
    WebXrData(String),
}

static RECEIVED: Mutex<Vec<Received>> = const_mutex(Vec::new());

/// The callback table is process-wide, so the tests take turns.
static SERIAL: Mutex<()> = const_mutex(());

fn exclusive() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    RECEIVED.lock().clear();
    events::unregister();
    guard
}

fn received() -> Vec<Received> {
    RECEIVED.lock().clone()
}

extern "C" fn record_start_ar(
    count: i32,
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    g: f32,
    h: f32,
) {
    RECEIVED
        .lock()
        .push(Received::StartAr(count, [a, b, c, d, e, f, g, h]));
}

extern "C" fn record_start_vr(
    count: i32,
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    g: f32,
    h: f32,
) {
    RECEIVED
        .lock()
        .push(Received::StartVr(count, [a, b, c, d, e, f, g, h]));
}

extern "C" fn record_end_xr() {
    RECEIVED.lock().push(Received::EndXr);
}

fn read(value: *const c_char) -> String {
    unsafe { CStr::from_ptr(value) }
        .to_string_lossy()
        .into_owned()
}

extern "C" fn record_capabilities(value: *const c_char) {
    RECEIVED.lock().push(Received::Capabilities(read(value)));
}

extern "C" fn record_webxr_data(value: *const c_char) {
    RECEIVED.lock().push(Received::WebXrData(read(value)));
}

fn install_all() {
    events::set_webxr_events(
        Some(record_start_ar),
        Some(record_start_vr),
        Some(record_end_xr),
        Some(record_capabilities),
        Some(record_webxr_data),
    );
}

#[test]
fn test_session_events_reach_registered_callbacks() {
    let _guard = exclusive();
    install_all();

    events::on_start_ar(2, 0.0, 0.0, 841.0, 706.0, 841.0, 0.0, 841.0, 706.0);
    events::on_start_vr(1, 0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
    events::on_end_xr();
    unsafe {
        events::on_xr_capabilities(c"{\"canPresentAR\":true}".as_ptr());
        events::on_webxr_data(c"{\"controllers\":[]}".as_ptr());
    }

    assert_eq!(
        received(),
        vec![
            Received::StartAr(2, [0.0, 0.0, 841.0, 706.0, 841.0, 0.0, 841.0, 706.0]),
            Received::StartVr(1, [0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Received::EndXr,
            Received::Capabilities("{\"canPresentAR\":true}".to_owned()),
            Received::WebXrData("{\"controllers\":[]}".to_owned()),
        ]
    );
}

#[test]
fn test_missing_callbacks_drop_events() {
    let _guard = exclusive();
    events::set_webxr_events(None, None, Some(record_end_xr), None, None);

    events::on_start_ar(2, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0);
    events::dispatch(&SessionEvent::Capabilities("{}".to_owned()));
    events::on_end_xr();
    assert_eq!(received(), vec![Received::EndXr]);
}

#[test]
fn test_null_strings_are_dropped() {
    let _guard = exclusive();
    install_all();
    unsafe {
        events::on_xr_capabilities(std::ptr::null());
        events::on_webxr_data(std::ptr::null());
    }
    assert!(received().is_empty());
}

#[test]
fn test_interior_nul_is_dropped() {
    let _guard = exclusive();
    install_all();
    events::dispatch(&SessionEvent::WebXrData("a\0b".to_owned()));
    assert!(received().is_empty());
}

#[test]
fn test_unregister_clears_the_table() {
    let _guard = exclusive();
    events::register(SessionEventCallbacks {
        on_end_xr: Some(record_end_xr),
        ..SessionEventCallbacks::default()
    });
    events::unregister();
    events::on_end_xr();
    assert!(received().is_empty());
}
