/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Drives the exported entry points through a fake host's C tables.

use std::ffi::{CStr, c_char, c_void};
use std::ptr;
use std::sync::OnceLock;

use parking_lot::{Mutex, const_mutex};
use webxr_bridge::api::mock::MockViewsData;
use webxr_bridge::ffi::*;

#[derive(Clone, Copy)]
struct Lifecycle {
    user_data: usize,
    initialize: LifecycleCallback,
    start: LifecycleCallback,
    stop: LifecycleNotification,
    shutdown: LifecycleNotification,
}

impl Lifecycle {
    fn user_data(&self) -> *mut c_void {
        self.user_data as *mut c_void
    }
}

type Populate = unsafe extern "C" fn(
    SubsystemHandle,
    *mut c_void,
    *const XrFrameSetupHints,
    *mut XrNextFrameDesc,
) -> SubsystemErrorCode;

#[derive(Default)]
struct FakeHost {
    lifecycles: Vec<(String, String, Lifecycle)>,
    populate: Option<(usize, Populate)>,
    textures: Vec<XrRenderTextureDesc>,
    destroyed: Vec<u32>,
    connected: Vec<u32>,
    disconnected: Vec<u32>,
}

static HOST: Mutex<Option<FakeHost>> = const_mutex(None);

fn with_host<R>(f: impl FnOnce(&mut FakeHost) -> R) -> R {
    f(HOST.lock().get_or_insert_with(FakeHost::default))
}

fn read(value: *const c_char) -> String {
    unsafe { CStr::from_ptr(value) }
        .to_string_lossy()
        .into_owned()
}

unsafe extern "C" fn register_lifecycle(
    plugin_name: *const c_char,
    subsystem_id: *const c_char,
    provider: *const LifecycleProvider,
) -> SubsystemErrorCode {
    let provider = unsafe { &*provider };
    let (Some(initialize), Some(start), Some(stop), Some(shutdown)) = (
        provider.initialize,
        provider.start,
        provider.stop,
        provider.shutdown,
    ) else {
        return SubsystemErrorCode::Failure;
    };
    let lifecycle = Lifecycle {
        user_data: provider.user_data as usize,
        initialize,
        start,
        stop,
        shutdown,
    };
    with_host(|host| {
        host.lifecycles
            .push((read(plugin_name), read(subsystem_id), lifecycle))
    });
    SubsystemErrorCode::Success
}

unsafe extern "C" fn register_graphics_thread(
    _: SubsystemHandle,
    provider: *const GraphicsThreadProvider,
) -> SubsystemErrorCode {
    let provider = unsafe { &*provider };
    let user_data = provider.user_data as usize;
    with_host(|host| {
        host.populate = provider
            .populate_next_frame_desc
            .map(|populate| (user_data, populate))
    });
    SubsystemErrorCode::Success
}

unsafe extern "C" fn register_display(
    _: SubsystemHandle,
    _: *const DisplayProviderCallbacks,
) -> SubsystemErrorCode {
    SubsystemErrorCode::Success
}

unsafe extern "C" fn create_texture(
    _: SubsystemHandle,
    desc: *const XrRenderTextureDesc,
    id: *mut u32,
) -> SubsystemErrorCode {
    let count = with_host(|host| {
        host.textures.push(unsafe { *desc });
        host.textures.len() as u32
    });
    unsafe { *id = count };
    SubsystemErrorCode::Success
}

unsafe extern "C" fn destroy_texture(_: SubsystemHandle, id: u32) -> SubsystemErrorCode {
    with_host(|host| host.destroyed.push(id));
    SubsystemErrorCode::Success
}

unsafe extern "C" fn register_input(
    _: SubsystemHandle,
    _: *const InputProviderCallbacks,
) -> SubsystemErrorCode {
    SubsystemErrorCode::Success
}

unsafe extern "C" fn device_connected(_: SubsystemHandle, id: u32) {
    with_host(|host| host.connected.push(id));
}

unsafe extern "C" fn device_disconnected(_: SubsystemHandle, id: u32) {
    with_host(|host| host.disconnected.push(id));
}

unsafe extern "C" fn get_views_data(len: *mut usize) -> *const f32 {
    static VIEWS: OnceLock<Vec<f32>> = OnceLock::new();
    let views = VIEWS.get_or_init(|| MockViewsData::stereo().into_vec());
    unsafe { *len = views.len() };
    views.as_ptr()
}

static DISPLAY: DisplayInterface = DisplayInterface {
    register_lifecycle_provider: Some(register_lifecycle),
    register_provider_for_graphics_thread: Some(register_graphics_thread),
    register_provider: Some(register_display),
    create_texture: Some(create_texture),
    destroy_texture: Some(destroy_texture),
    query_native_texture: None,
};

static INPUT: InputInterface = InputInterface {
    register_lifecycle_provider: Some(register_lifecycle),
    register_input_provider: Some(register_input),
    device_connected: Some(device_connected),
    device_disconnected: Some(device_disconnected),
    definition_set_name: None,
    definition_set_manufacturer: None,
    definition_set_serial_number: None,
    definition_set_characteristics: None,
    definition_add_feature_with_usage: None,
    state_set_binary_value: None,
    state_set_discrete_state_value: None,
    state_set_axis3d_value: None,
    state_set_rotation_value: None,
};

fn handle() -> SubsystemHandle {
    SubsystemHandle(ptr::null_mut())
}

fn lifecycle(subsystem_id: &str) -> Lifecycle {
    with_host(|host| {
        host.lifecycles
            .iter()
            .find(|(_, id, _)| id == subsystem_id)
            .map(|(_, _, lifecycle)| *lifecycle)
            .unwrap()
    })
}

#[test]
fn test_load_without_tables_fails() {
    assert_eq!(
        unsafe { webxr_bridge_plugin_load(ptr::null()) },
        SubsystemErrorCode::Failure
    );

    let interfaces = HostInterfaces {
        display: &DISPLAY,
        input: &INPUT,
        get_views_data: None,
        get_proc_address: None,
    };
    assert_eq!(
        unsafe { webxr_bridge_plugin_load(&interfaces) },
        SubsystemErrorCode::Failure
    );
}

#[test]
fn test_session_through_the_c_interface() {
    let interfaces = HostInterfaces {
        display: &DISPLAY,
        input: &INPUT,
        get_views_data: Some(get_views_data),
        get_proc_address: None,
    };
    assert_eq!(
        unsafe { webxr_bridge_plugin_load(&interfaces) },
        SubsystemErrorCode::Success
    );
    with_host(|host| {
        let names: Vec<(&str, &str)> = host
            .lifecycles
            .iter()
            .map(|(plugin, id, _)| (plugin.as_str(), id.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("WebXR Export", "WebXR Display"),
                ("WebXR Export", "WebXR Tracked Display"),
            ]
        );
    });

    let display = lifecycle("WebXR Display");
    unsafe {
        assert_eq!(
            (display.initialize)(handle(), display.user_data()),
            SubsystemErrorCode::Success
        );
        assert_eq!(
            (display.start)(handle(), display.user_data()),
            SubsystemErrorCode::Success
        );
    }

    let (user_data, populate) = with_host(|host| host.populate).unwrap();
    let hints = XrFrameSetupHints {
        app_setup: XrAppSetup {
            single_pass_rendering: false,
            texture_resolution_scale: 1.0,
            render_viewport: XrRectf {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
            },
        },
        changed_flags: 0,
    };
    let mut desc = XrNextFrameDesc::default();
    unsafe {
        let user_data = user_data as *mut c_void;
        assert_eq!(
            populate(handle(), user_data, &hints, &mut desc),
            SubsystemErrorCode::Success
        );
        assert_eq!(desc.render_passes_count, 0);
        assert_eq!(
            populate(handle(), user_data, &hints, &mut desc),
            SubsystemErrorCode::Success
        );
    }
    assert_eq!(desc.render_passes_count, 2);
    assert_eq!(desc.render_passes[0].texture_id, 1);
    assert_eq!(desc.render_passes[1].render_params[0].viewport_rect.x, 0.5);
    with_host(|host| {
        assert_eq!(
            host.textures,
            vec![XrRenderTextureDesc {
                width: 1682,
                height: 706,
                texture_array_length: 0,
            }]
        )
    });

    let input = lifecycle("WebXR Tracked Display");
    unsafe {
        assert_eq!(
            (input.initialize)(handle(), input.user_data()),
            SubsystemErrorCode::Success
        );
        assert_eq!(
            (input.start)(handle(), input.user_data()),
            SubsystemErrorCode::Success
        );
        (input.stop)(handle(), input.user_data());
        (display.stop)(handle(), display.user_data());
        (display.shutdown)(handle(), display.user_data());
        (input.shutdown)(handle(), input.user_data());
    }
    with_host(|host| {
        assert_eq!(host.connected, vec![72]);
        assert_eq!(host.disconnected, vec![72]);
        assert_eq!(host.destroyed, vec![1]);
    });

    unsafe { webxr_bridge_plugin_unload() };
}
