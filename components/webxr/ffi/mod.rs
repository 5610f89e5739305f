/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The C ABI the host engine loads: entry points, lifecycle registration and
//! the trampolines forwarding the host's callbacks to the providers.
//!
//! Every table registered with the host carries a pointer to the single
//! [`PluginContext`] as its user data. The host serializes lifecycle,
//! render-thread and input callbacks, so the locks here are never contended.

#![allow(unsafe_code)]

use std::ffi::{CStr, c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use parking_lot::Mutex;
use webxr_bridge_api::{
    DisplayState, Error, FrameSetupHints, InputDeviceId, InputUpdateType, MirrorViewBlitDesc,
    MirrorViewBlitInfo, NextFrameDesc, RenderingCapabilities,
};

use crate::compositor::{Compositor, HostCompositor};
use crate::display::DisplayProvider;
use crate::prefs::{BridgePrefs, CompositingMode};
use crate::provider::Provider;
use crate::tracking::TrackingProvider;

mod host;
mod types;

pub use host::*;
pub use types::*;

pub const PLUGIN_NAME: &CStr = c"WebXR Export";
pub const DISPLAY_SUBSYSTEM_ID: &CStr = c"WebXR Display";
pub const INPUT_SUBSYSTEM_ID: &CStr = c"WebXR Tracked Display";

type GetProcAddress = unsafe extern "C" fn(*const c_char) -> *const c_void;

struct PluginContext {
    prefs: BridgePrefs,
    views: ViewsAccessor,
    display_interface: Option<&'static DisplayInterface>,
    input_interface: Option<&'static InputInterface>,
    #[cfg_attr(not(feature = "gl"), allow(dead_code))]
    get_proc_address: Option<GetProcAddress>,
    display: Mutex<Option<DisplayProvider>>,
    tracking: Mutex<Option<TrackingProvider>>,
}

static CONTEXT: AtomicPtr<PluginContext> = AtomicPtr::new(ptr::null_mut());

impl PluginContext {
    fn compositor(&self) -> Box<dyn Compositor> {
        match self.prefs.compositing {
            CompositingMode::Host => Box::new(HostCompositor),
            CompositingMode::Gl => self.gl_compositor().unwrap_or_else(|| {
                log::warn!("GL compositing is unavailable, leaving presentation to the host");
                Box::new(HostCompositor)
            }),
        }
    }

    #[cfg(feature = "gl")]
    fn gl_compositor(&self) -> Option<Box<dyn Compositor>> {
        use std::rc::Rc;

        let get_proc_address = self.get_proc_address?;
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| get_proc_address(name.as_ptr()))
        };
        Some(Box::new(crate::compositor::GlCompositor::new(Rc::new(gl))))
    }

    #[cfg(not(feature = "gl"))]
    fn gl_compositor(&self) -> Option<Box<dyn Compositor>> {
        None
    }

    fn shutdown(&self) {
        if let Some(mut display) = self.display.lock().take() {
            display.shutdown();
        }
        if let Some(mut tracking) = self.tracking.lock().take() {
            tracking.shutdown();
        }
    }
}

/// # Safety
///
/// `user_data` must be null or the pointer registered by
/// [`webxr_bridge_plugin_load`], not yet unloaded.
unsafe fn context<'a>(user_data: *mut c_void) -> Option<&'a PluginContext> {
    unsafe { user_data.cast::<PluginContext>().as_ref() }
}

unsafe fn with_display(
    user_data: *mut c_void,
    operation: &str,
    f: impl FnOnce(&mut DisplayProvider) -> Result<(), Error>,
) -> SubsystemErrorCode {
    let Some(context) = (unsafe { context(user_data) }) else {
        return SubsystemErrorCode::Failure;
    };
    let result = match context.display.lock().as_mut() {
        Some(display) => f(display),
        None => Err(Error::NotReady),
    };
    SubsystemErrorCode::from_result(result, operation)
}

unsafe fn with_tracking(
    user_data: *mut c_void,
    operation: &str,
    f: impl FnOnce(&mut TrackingProvider, &'static InputInterface) -> Result<(), Error>,
) -> SubsystemErrorCode {
    let Some(context) = (unsafe { context(user_data) }) else {
        return SubsystemErrorCode::Failure;
    };
    let Some(interface) = context.input_interface else {
        return SubsystemErrorCode::Failure;
    };
    let result = match context.tracking.lock().as_mut() {
        Some(tracking) => f(tracking, interface),
        None => Err(Error::NotReady),
    };
    SubsystemErrorCode::from_result(result, operation)
}

/// Called by the host once, before any subsystem is created.
///
/// # Safety
///
/// `interfaces` must be null or point to tables that outlive the plugin.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webxr_bridge_plugin_load(
    interfaces: *const HostInterfaces,
) -> SubsystemErrorCode {
    crate::init_logging();

    let Some(interfaces) = (unsafe { interfaces.as_ref() }) else {
        log::error!("Plugin loaded without host interfaces");
        return SubsystemErrorCode::Failure;
    };
    let Some(views) = ViewsAccessor::resolve(interfaces.get_views_data) else {
        log::error!("Plugin loaded without a views data accessor");
        return SubsystemErrorCode::Failure;
    };

    let context = Box::into_raw(Box::new(PluginContext {
        prefs: BridgePrefs::from_env(),
        views,
        display_interface: unsafe { interfaces.display.as_ref() },
        input_interface: unsafe { interfaces.input.as_ref() },
        get_proc_address: interfaces.get_proc_address,
        display: Mutex::new(None),
        tracking: Mutex::new(None),
    }));
    let previous = CONTEXT.swap(context, Ordering::AcqRel);
    if !previous.is_null() {
        log::warn!("Plugin loaded twice, dropping the previous instance");
        let previous = unsafe { Box::from_raw(previous) };
        previous.shutdown();
    }

    let user_data = context.cast::<c_void>();
    let context = unsafe { &*context };
    let display = load_display(context, user_data);
    if let Err(ref error) = display {
        log::error!("Display subsystem not registered: {error}");
    }
    let input = load_input(context, user_data);
    if let Err(ref error) = input {
        log::error!("Input subsystem not registered: {error}");
    }

    if display.is_ok() || input.is_ok() {
        SubsystemErrorCode::Success
    } else {
        SubsystemErrorCode::Failure
    }
}

/// Called by the host when the plugin is unloaded. Shuts down any provider
/// still alive.
///
/// # Safety
///
/// No callback registered by this plugin may run concurrently or afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn webxr_bridge_plugin_unload() {
    let context = CONTEXT.swap(ptr::null_mut(), Ordering::AcqRel);
    if !context.is_null() {
        let context = unsafe { Box::from_raw(context) };
        context.shutdown();
    }
}

fn register_lifecycle(
    register: Option<RegisterLifecycleProvider>,
    subsystem_id: &CStr,
    lifecycle: &LifecycleProvider,
) -> Result<(), Error> {
    let register = register.ok_or_else(|| {
        Error::MissingInterface(format!("{} lifecycle registration", subsystem_id.to_string_lossy()))
    })?;
    match unsafe { register(PLUGIN_NAME.as_ptr(), subsystem_id.as_ptr(), lifecycle) } {
        SubsystemErrorCode::Success => Ok(()),
        SubsystemErrorCode::Failure => Err(Error::BackendSpecific(format!(
            "host rejected {}",
            subsystem_id.to_string_lossy()
        ))),
    }
}

fn load_display(context: &PluginContext, user_data: *mut c_void) -> Result<(), Error> {
    let interface = context
        .display_interface
        .ok_or_else(|| Error::MissingInterface("display".to_owned()))?;
    let lifecycle = LifecycleProvider {
        user_data,
        initialize: Some(display_initialize),
        start: Some(display_start),
        stop: Some(display_stop),
        shutdown: Some(display_shutdown),
    };
    register_lifecycle(
        interface.register_lifecycle_provider,
        DISPLAY_SUBSYSTEM_ID,
        &lifecycle,
    )
}

fn load_input(context: &PluginContext, user_data: *mut c_void) -> Result<(), Error> {
    let interface = context
        .input_interface
        .ok_or_else(|| Error::MissingInterface("input".to_owned()))?;
    let lifecycle = LifecycleProvider {
        user_data,
        initialize: Some(input_initialize),
        start: Some(input_start),
        stop: Some(input_stop),
        shutdown: Some(input_shutdown),
    };
    register_lifecycle(
        interface.register_lifecycle_provider,
        INPUT_SUBSYSTEM_ID,
        &lifecycle,
    )
}

unsafe extern "C" fn display_initialize(
    handle: SubsystemHandle,
    user_data: *mut c_void,
) -> SubsystemErrorCode {
    let Some(context) = (unsafe { context(user_data) }) else {
        return SubsystemErrorCode::Failure;
    };
    let Some(interface) = context.display_interface else {
        return SubsystemErrorCode::Failure;
    };

    let provider = DisplayProvider::new(
        Box::new(FfiDisplayHost { interface, handle }),
        Box::new(context.views),
        context.compositor(),
        &context.prefs,
    );
    *context.display.lock() = Some(provider);

    let graphics_thread = GraphicsThreadProvider {
        user_data,
        start: Some(gfx_start),
        submit_current_frame: Some(gfx_submit_current_frame),
        populate_next_frame_desc: Some(gfx_populate_next_frame_desc),
        stop: Some(gfx_stop),
        blit_to_mirror_view_render_target: Some(gfx_blit_to_mirror_view_render_target),
    };
    match interface.register_provider_for_graphics_thread {
        Some(register) => {
            if unsafe { register(handle, &graphics_thread) } != SubsystemErrorCode::Success {
                log::error!("Host rejected the render thread callbacks");
            }
        },
        None => log::error!("Host cannot register render thread callbacks"),
    }

    let callbacks = DisplayProviderCallbacks {
        user_data,
        update_display_state: Some(display_update_state),
        query_mirror_view_blit_desc: Some(display_query_mirror_view_blit_desc),
    };
    match interface.register_provider {
        Some(register) => {
            if unsafe { register(handle, &callbacks) } != SubsystemErrorCode::Success {
                log::error!("Host rejected the display callbacks");
            }
        },
        None => log::error!("Host cannot register display callbacks"),
    }

    unsafe { with_display(user_data, "Display initialize", |display| display.initialize()) }
}

unsafe extern "C" fn display_start(_: SubsystemHandle, user_data: *mut c_void) -> SubsystemErrorCode {
    unsafe { with_display(user_data, "Display start", |display| display.start()) }
}

unsafe extern "C" fn display_stop(_: SubsystemHandle, user_data: *mut c_void) {
    unsafe {
        with_display(user_data, "Display stop", |display| {
            display.stop();
            Ok(())
        })
    };
}

unsafe extern "C" fn display_shutdown(_: SubsystemHandle, user_data: *mut c_void) {
    let Some(context) = (unsafe { context(user_data) }) else {
        return;
    };
    if let Some(mut display) = context.display.lock().take() {
        display.shutdown();
    }
}

unsafe extern "C" fn gfx_start(
    _: SubsystemHandle,
    user_data: *mut c_void,
    caps: *mut XrRenderingCapabilities,
) -> SubsystemErrorCode {
    let Some(caps) = (unsafe { caps.as_mut() }) else {
        return SubsystemErrorCode::Failure;
    };
    unsafe {
        with_display(user_data, "Render thread start", |display| {
            let mut capabilities = RenderingCapabilities::from(*caps);
            let result = display.gfx_start(&mut capabilities);
            *caps = capabilities.into();
            result
        })
    }
}

unsafe extern "C" fn gfx_submit_current_frame(
    _: SubsystemHandle,
    user_data: *mut c_void,
) -> SubsystemErrorCode {
    unsafe {
        with_display(user_data, "Submit frame", |display| {
            display.gfx_submit_current_frame()
        })
    }
}

unsafe extern "C" fn gfx_populate_next_frame_desc(
    _: SubsystemHandle,
    user_data: *mut c_void,
    hints: *const XrFrameSetupHints,
    next_frame: *mut XrNextFrameDesc,
) -> SubsystemErrorCode {
    let (Some(hints), Some(next_frame)) = (unsafe { hints.as_ref() }, unsafe { next_frame.as_mut() })
    else {
        return SubsystemErrorCode::Failure;
    };
    let hints = FrameSetupHints::from(hints);
    unsafe {
        with_display(user_data, "Populate next frame", |display| {
            let mut desc = NextFrameDesc::default();
            display.populate_next_frame_desc(&hints, &mut desc)?;
            // A skipped frame leaves the host's descriptor as it was.
            if !desc.render_passes.is_empty() {
                next_frame.write(&desc);
            }
            Ok(())
        })
    }
}

unsafe extern "C" fn gfx_stop(_: SubsystemHandle, user_data: *mut c_void) -> SubsystemErrorCode {
    unsafe { with_display(user_data, "Render thread stop", |display| display.gfx_stop()) }
}

unsafe extern "C" fn gfx_blit_to_mirror_view_render_target(
    _: SubsystemHandle,
    user_data: *mut c_void,
    info: XrMirrorViewBlitInfo,
) -> SubsystemErrorCode {
    let info = MirrorViewBlitInfo::from(&info);
    unsafe {
        with_display(user_data, "Mirror view blit", |display| {
            display.gfx_blit_to_mirror_view_render_target(&info)
        })
    }
}

unsafe extern "C" fn display_update_state(
    _: SubsystemHandle,
    user_data: *mut c_void,
    state: *mut XrDisplayState,
) -> SubsystemErrorCode {
    let Some(state) = (unsafe { state.as_mut() }) else {
        return SubsystemErrorCode::Failure;
    };
    unsafe {
        with_display(user_data, "Update display state", |display| {
            let mut display_state = DisplayState::default();
            display.update_display_state(&mut display_state)?;
            *state = display_state.into();
            Ok(())
        })
    }
}

unsafe extern "C" fn display_query_mirror_view_blit_desc(
    _: SubsystemHandle,
    user_data: *mut c_void,
    info: *const XrMirrorViewBlitInfo,
    desc: *mut XrMirrorViewBlitDesc,
) -> SubsystemErrorCode {
    let (Some(info), Some(desc)) = (unsafe { info.as_ref() }, unsafe { desc.as_mut() }) else {
        return SubsystemErrorCode::Failure;
    };
    let info = MirrorViewBlitInfo::from(info);
    unsafe {
        with_display(user_data, "Mirror view query", |display| {
            let mut blits = MirrorViewBlitDesc::default();
            display.query_mirror_view_blit_desc(&info, &mut blits)?;
            *desc = XrMirrorViewBlitDesc::from(&blits);
            Ok(())
        })
    }
}

fn update_type(value: u32) -> InputUpdateType {
    match value {
        0 => InputUpdateType::Dynamic,
        _ => InputUpdateType::BeforeRender,
    }
}

unsafe extern "C" fn input_initialize(
    handle: SubsystemHandle,
    user_data: *mut c_void,
) -> SubsystemErrorCode {
    let Some(context) = (unsafe { context(user_data) }) else {
        return SubsystemErrorCode::Failure;
    };
    let Some(interface) = context.input_interface else {
        return SubsystemErrorCode::Failure;
    };

    let provider = TrackingProvider::new(
        Box::new(FfiInputHost { interface, handle }),
        Box::new(context.views),
        &context.prefs,
    );
    *context.tracking.lock() = Some(provider);

    let callbacks = InputProviderCallbacks {
        user_data,
        tick: Some(input_tick),
        fill_device_definition: Some(input_fill_device_definition),
        update_device_state: Some(input_update_device_state),
        handle_event: Some(input_handle_event),
        try_get_device_state_at_time: Some(input_try_get_device_state_at_time),
    };
    match interface.register_input_provider {
        Some(register) => {
            if unsafe { register(handle, &callbacks) } != SubsystemErrorCode::Success {
                log::error!("Host rejected the input callbacks");
            }
        },
        None => log::error!("Host cannot register input callbacks"),
    }

    unsafe { with_tracking(user_data, "Input initialize", |tracking, _| tracking.initialize()) }
}

unsafe extern "C" fn input_start(_: SubsystemHandle, user_data: *mut c_void) -> SubsystemErrorCode {
    unsafe { with_tracking(user_data, "Input start", |tracking, _| tracking.start()) }
}

unsafe extern "C" fn input_stop(_: SubsystemHandle, user_data: *mut c_void) {
    unsafe {
        with_tracking(user_data, "Input stop", |tracking, _| {
            tracking.stop();
            Ok(())
        })
    };
}

unsafe extern "C" fn input_shutdown(_: SubsystemHandle, user_data: *mut c_void) {
    let Some(context) = (unsafe { context(user_data) }) else {
        return;
    };
    if let Some(mut tracking) = context.tracking.lock().take() {
        tracking.shutdown();
    }
}

unsafe extern "C" fn input_tick(
    _: SubsystemHandle,
    user_data: *mut c_void,
    kind: u32,
) -> SubsystemErrorCode {
    unsafe { with_tracking(user_data, "Input tick", |tracking, _| tracking.tick(update_type(kind))) }
}

unsafe extern "C" fn input_fill_device_definition(
    _: SubsystemHandle,
    user_data: *mut c_void,
    device_id: u32,
    definition: *mut c_void,
) -> SubsystemErrorCode {
    if definition.is_null() {
        return SubsystemErrorCode::Failure;
    }
    unsafe {
        with_tracking(user_data, "Fill device definition", |tracking, interface| {
            let mut definition = FfiDeviceDefinition {
                interface,
                definition,
            };
            tracking.fill_device_definition(InputDeviceId(device_id), &mut definition)
        })
    }
}

unsafe extern "C" fn input_update_device_state(
    _: SubsystemHandle,
    user_data: *mut c_void,
    device_id: u32,
    kind: u32,
    state: *mut c_void,
) -> SubsystemErrorCode {
    if state.is_null() {
        return SubsystemErrorCode::Failure;
    }
    unsafe {
        with_tracking(user_data, "Update device state", |tracking, interface| {
            let mut state = FfiDeviceState { interface, state };
            tracking.update_device_state(InputDeviceId(device_id), update_type(kind), &mut state)
        })
    }
}

unsafe extern "C" fn input_handle_event(
    _: SubsystemHandle,
    user_data: *mut c_void,
    event_type: u32,
    device_id: u32,
    buffer: *mut c_void,
    size: u32,
) -> SubsystemErrorCode {
    let payload: &[u8] = if buffer.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), size as usize) }
    };
    unsafe {
        with_tracking(user_data, "Input event", |tracking, _| {
            tracking.handle_event(event_type, InputDeviceId(device_id), payload)
        })
    }
}

unsafe extern "C" fn input_try_get_device_state_at_time(
    _: SubsystemHandle,
    user_data: *mut c_void,
    time: u64,
    device_id: u32,
    state: *mut c_void,
) -> SubsystemErrorCode {
    unsafe {
        with_tracking(user_data, "Device state at time", |tracking, interface| {
            let mut state = FfiDeviceState { interface, state };
            tracking.try_get_device_state_at_time(time, InputDeviceId(device_id), &mut state)
        })
    }
}
