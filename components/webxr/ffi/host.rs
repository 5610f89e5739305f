/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The host's C interface tables, and the api traits implemented on top
//! of them.

use std::ffi::{CString, c_char, c_void};
use std::slice;

use euclid::{Rotation3D, Vector3D};
use webxr_bridge_api::{
    DeviceCharacteristics, DeviceDefinition, DeviceState, DisplayHost, Error, FeatureIndex,
    FeatureType, FeatureUsage, InputDeviceId, InputHost, Native, RenderTextureDesc,
    RenderTextureId, ViewsData, ViewsDataSource,
};

use super::types::{
    SubsystemErrorCode, XrDisplayState, XrFrameSetupHints, XrMirrorViewBlitDesc,
    XrMirrorViewBlitInfo, XrNextFrameDesc, XrRenderTextureDesc, XrRenderingCapabilities,
    XrVector3, XrVector4,
};

/// The host's handle for one registered subsystem.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SubsystemHandle(pub *mut c_void);

pub type LifecycleCallback =
    unsafe extern "C" fn(handle: SubsystemHandle, user_data: *mut c_void) -> SubsystemErrorCode;
pub type LifecycleNotification = unsafe extern "C" fn(handle: SubsystemHandle, user_data: *mut c_void);

/// Lifecycle callbacks of one subsystem.
#[repr(C)]
pub struct LifecycleProvider {
    pub user_data: *mut c_void,
    pub initialize: Option<LifecycleCallback>,
    pub start: Option<LifecycleCallback>,
    pub stop: Option<LifecycleNotification>,
    pub shutdown: Option<LifecycleNotification>,
}

/// Display callbacks the host invokes on its render thread.
#[repr(C)]
pub struct GraphicsThreadProvider {
    pub user_data: *mut c_void,
    pub start: Option<
        unsafe extern "C" fn(
            SubsystemHandle,
            *mut c_void,
            *mut XrRenderingCapabilities,
        ) -> SubsystemErrorCode,
    >,
    pub submit_current_frame: Option<LifecycleCallback>,
    pub populate_next_frame_desc: Option<
        unsafe extern "C" fn(
            SubsystemHandle,
            *mut c_void,
            *const XrFrameSetupHints,
            *mut XrNextFrameDesc,
        ) -> SubsystemErrorCode,
    >,
    pub stop: Option<LifecycleCallback>,
    pub blit_to_mirror_view_render_target: Option<
        unsafe extern "C" fn(SubsystemHandle, *mut c_void, XrMirrorViewBlitInfo) -> SubsystemErrorCode,
    >,
}

/// Display callbacks the host invokes from its main loop.
#[repr(C)]
pub struct DisplayProviderCallbacks {
    pub user_data: *mut c_void,
    pub update_display_state: Option<
        unsafe extern "C" fn(SubsystemHandle, *mut c_void, *mut XrDisplayState) -> SubsystemErrorCode,
    >,
    pub query_mirror_view_blit_desc: Option<
        unsafe extern "C" fn(
            SubsystemHandle,
            *mut c_void,
            *const XrMirrorViewBlitInfo,
            *mut XrMirrorViewBlitDesc,
        ) -> SubsystemErrorCode,
    >,
}

pub type RegisterLifecycleProvider = unsafe extern "C" fn(
    plugin_name: *const c_char,
    subsystem_id: *const c_char,
    provider: *const LifecycleProvider,
) -> SubsystemErrorCode;

/// The host's display subsystem.
#[repr(C)]
pub struct DisplayInterface {
    pub register_lifecycle_provider: Option<RegisterLifecycleProvider>,
    pub register_provider_for_graphics_thread: Option<
        unsafe extern "C" fn(SubsystemHandle, *const GraphicsThreadProvider) -> SubsystemErrorCode,
    >,
    pub register_provider: Option<
        unsafe extern "C" fn(SubsystemHandle, *const DisplayProviderCallbacks) -> SubsystemErrorCode,
    >,
    pub create_texture: Option<
        unsafe extern "C" fn(
            SubsystemHandle,
            *const XrRenderTextureDesc,
            *mut u32,
        ) -> SubsystemErrorCode,
    >,
    pub destroy_texture: Option<unsafe extern "C" fn(SubsystemHandle, u32) -> SubsystemErrorCode>,
    pub query_native_texture:
        Option<unsafe extern "C" fn(SubsystemHandle, u32, *mut u32) -> SubsystemErrorCode>,
}

/// Input callbacks the host invokes.
#[repr(C)]
pub struct InputProviderCallbacks {
    pub user_data: *mut c_void,
    pub tick: Option<unsafe extern "C" fn(SubsystemHandle, *mut c_void, u32) -> SubsystemErrorCode>,
    pub fill_device_definition: Option<
        unsafe extern "C" fn(SubsystemHandle, *mut c_void, u32, *mut c_void) -> SubsystemErrorCode,
    >,
    pub update_device_state: Option<
        unsafe extern "C" fn(SubsystemHandle, *mut c_void, u32, u32, *mut c_void) -> SubsystemErrorCode,
    >,
    pub handle_event: Option<
        unsafe extern "C" fn(
            SubsystemHandle,
            *mut c_void,
            u32,
            u32,
            *mut c_void,
            u32,
        ) -> SubsystemErrorCode,
    >,
    pub try_get_device_state_at_time: Option<
        unsafe extern "C" fn(SubsystemHandle, *mut c_void, u64, u32, *mut c_void) -> SubsystemErrorCode,
    >,
}

/// The host's input subsystem. Device definitions and states are opaque
/// host objects written through the accessors here.
#[repr(C)]
pub struct InputInterface {
    pub register_lifecycle_provider: Option<RegisterLifecycleProvider>,
    pub register_input_provider: Option<
        unsafe extern "C" fn(SubsystemHandle, *const InputProviderCallbacks) -> SubsystemErrorCode,
    >,
    pub device_connected: Option<unsafe extern "C" fn(SubsystemHandle, u32)>,
    pub device_disconnected: Option<unsafe extern "C" fn(SubsystemHandle, u32)>,
    pub definition_set_name: Option<unsafe extern "C" fn(*mut c_void, *const c_char)>,
    pub definition_set_manufacturer: Option<unsafe extern "C" fn(*mut c_void, *const c_char)>,
    pub definition_set_serial_number: Option<unsafe extern "C" fn(*mut c_void, *const c_char)>,
    pub definition_set_characteristics: Option<unsafe extern "C" fn(*mut c_void, u32)>,
    pub definition_add_feature_with_usage:
        Option<unsafe extern "C" fn(*mut c_void, *const c_char, u32, u32) -> u32>,
    pub state_set_binary_value: Option<unsafe extern "C" fn(*mut c_void, u32, bool)>,
    pub state_set_discrete_state_value: Option<unsafe extern "C" fn(*mut c_void, u32, u32)>,
    pub state_set_axis3d_value: Option<unsafe extern "C" fn(*mut c_void, u32, XrVector3)>,
    pub state_set_rotation_value: Option<unsafe extern "C" fn(*mut c_void, u32, XrVector4)>,
}

/// Returns the current views buffer and writes its length, or null.
pub type GetViewsData = unsafe extern "C" fn(len: *mut usize) -> *const f32;

/// Everything the host hands the plugin at load time. Any table may be null.
#[repr(C)]
pub struct HostInterfaces {
    pub display: *const DisplayInterface,
    pub input: *const InputInterface,
    pub get_views_data: Option<GetViewsData>,
    pub get_proc_address: Option<unsafe extern "C" fn(*const c_char) -> *const c_void>,
}

#[cfg(target_os = "emscripten")]
unsafe extern "C" {
    /// Provided by the page-side driver of the WebXR session.
    fn WebXRGetViewsDataArray() -> *mut f32;
}

/// Where the views buffer is fetched from each frame.
#[derive(Clone, Copy, Debug)]
pub enum ViewsAccessor {
    Host(GetViewsData),
    #[cfg(target_os = "emscripten")]
    Browser,
}

impl ViewsAccessor {
    pub fn resolve(host: Option<GetViewsData>) -> Option<ViewsAccessor> {
        match host {
            Some(accessor) => Some(ViewsAccessor::Host(accessor)),
            #[cfg(target_os = "emscripten")]
            None => Some(ViewsAccessor::Browser),
            #[cfg(not(target_os = "emscripten"))]
            None => None,
        }
    }
}

impl ViewsDataSource for ViewsAccessor {
    fn read(&self) -> Result<ViewsData, Error> {
        let (data, len) = match *self {
            ViewsAccessor::Host(accessor) => {
                let mut len = 0;
                let data = unsafe { accessor(&mut len) };
                (data, len)
            },
            #[cfg(target_os = "emscripten")]
            ViewsAccessor::Browser => {
                (
                    unsafe { WebXRGetViewsDataArray() } as *const f32,
                    webxr_bridge_api::VIEWS_DATA_LEN,
                )
            },
        };
        if data.is_null() {
            return Err(Error::ViewsDataUnavailable);
        }
        // The buffer stays valid until the producer publishes the next frame,
        // which cannot happen while the host is inside one of our callbacks.
        let buffer = unsafe { slice::from_raw_parts(data, len) };
        ViewsData::decode(buffer)
    }
}

/// Convert for the host, replacing a string it cannot represent.
fn c_string(value: &str) -> CString {
    CString::new(value).unwrap_or_else(|_| {
        log::warn!("String {value:?} has an interior NUL; sending it empty");
        CString::default()
    })
}

pub struct FfiDisplayHost {
    pub interface: &'static DisplayInterface,
    pub handle: SubsystemHandle,
}

impl DisplayHost for FfiDisplayHost {
    fn create_texture(&mut self, desc: &RenderTextureDesc) -> Result<RenderTextureId, Error> {
        let create = self
            .interface
            .create_texture
            .ok_or_else(|| Error::MissingInterface("create_texture".to_owned()))?;
        let desc = XrRenderTextureDesc::from(desc);
        let mut id = 0;
        match unsafe { create(self.handle, &desc, &mut id) } {
            SubsystemErrorCode::Success => Ok(RenderTextureId(id)),
            SubsystemErrorCode::Failure => Err(Error::TextureAllocation(format!(
                "host refused a {}x{} texture",
                desc.width, desc.height
            ))),
        }
    }

    fn destroy_texture(&mut self, id: RenderTextureId) {
        if let Some(destroy) = self.interface.destroy_texture {
            if unsafe { destroy(self.handle, id.0) } != SubsystemErrorCode::Success {
                log::warn!("Host failed to destroy render texture {id:?}");
            }
        }
    }

    fn native_texture(&self, id: RenderTextureId) -> Option<u32> {
        let query = self.interface.query_native_texture?;
        let mut native = 0;
        match unsafe { query(self.handle, id.0, &mut native) } {
            SubsystemErrorCode::Success if native != 0 => Some(native),
            _ => None,
        }
    }
}

pub struct FfiInputHost {
    pub interface: &'static InputInterface,
    pub handle: SubsystemHandle,
}

impl InputHost for FfiInputHost {
    fn device_connected(&mut self, id: InputDeviceId) {
        if let Some(connected) = self.interface.device_connected {
            unsafe { connected(self.handle, id.0) };
        }
    }

    fn device_disconnected(&mut self, id: InputDeviceId) {
        if let Some(disconnected) = self.interface.device_disconnected {
            unsafe { disconnected(self.handle, id.0) };
        }
    }
}

pub struct FfiDeviceDefinition {
    pub interface: &'static InputInterface,
    pub definition: *mut c_void,
}

impl FfiDeviceDefinition {
    fn set_string(&mut self, setter: Option<unsafe extern "C" fn(*mut c_void, *const c_char)>, value: &str) {
        if let Some(setter) = setter {
            let value = c_string(value);
            unsafe { setter(self.definition, value.as_ptr()) };
        }
    }
}

impl DeviceDefinition for FfiDeviceDefinition {
    fn set_name(&mut self, name: &str) {
        self.set_string(self.interface.definition_set_name, name);
    }

    fn set_manufacturer(&mut self, manufacturer: &str) {
        self.set_string(self.interface.definition_set_manufacturer, manufacturer);
    }

    fn set_serial_number(&mut self, serial_number: &str) {
        self.set_string(self.interface.definition_set_serial_number, serial_number);
    }

    fn set_characteristics(&mut self, characteristics: DeviceCharacteristics) {
        if let Some(set) = self.interface.definition_set_characteristics {
            unsafe { set(self.definition, characteristics.bits()) };
        }
    }

    fn add_feature(
        &mut self,
        name: &str,
        feature_type: FeatureType,
        usage: FeatureUsage,
    ) -> FeatureIndex {
        let Some(add) = self.interface.definition_add_feature_with_usage else {
            log::warn!("Host cannot declare feature {name:?}");
            return FeatureIndex(u32::MAX);
        };
        let name = c_string(name);
        FeatureIndex(unsafe { add(self.definition, name.as_ptr(), feature_type as u32, usage as u32) })
    }
}

pub struct FfiDeviceState {
    pub interface: &'static InputInterface,
    pub state: *mut c_void,
}

impl DeviceState for FfiDeviceState {
    fn set_binary(&mut self, index: FeatureIndex, value: bool) {
        if let Some(set) = self.interface.state_set_binary_value {
            unsafe { set(self.state, index.0, value) };
        }
    }

    fn set_discrete_state(&mut self, index: FeatureIndex, value: u32) {
        if let Some(set) = self.interface.state_set_discrete_state_value {
            unsafe { set(self.state, index.0, value) };
        }
    }

    fn set_axis3d(&mut self, index: FeatureIndex, value: Vector3D<f32, Native>) {
        if let Some(set) = self.interface.state_set_axis3d_value {
            unsafe { set(self.state, index.0, value.into()) };
        }
    }

    fn set_rotation(&mut self, index: FeatureIndex, value: Rotation3D<f32, Native, Native>) {
        if let Some(set) = self.interface.state_set_rotation_value {
            unsafe { set(self.state, index.0, value.into()) };
        }
    }
}
