/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The tracking provider, reporting the head and eye poses of the session
//! as a single tracked input device.

use webxr_bridge_api::{
    DeviceCharacteristics, DeviceDefinition, DeviceState, Error, FeatureIndex, FeatureType,
    FeatureUsage, InputDeviceId, InputHost, InputUpdateType, TrackingState, ViewsData,
    ViewsDataSource,
};

use crate::prefs::BridgePrefs;
use crate::provider::{Provider, ProviderState};

/// A position and rotation pair of feature slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoseFeatures {
    pub position: FeatureIndex,
    pub rotation: FeatureIndex,
}

/// The slots the host handed out when the device was defined.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeadFeatures {
    pub is_tracked: FeatureIndex,
    pub tracking_state: FeatureIndex,
    pub device: PoseFeatures,
    pub center_eye: PoseFeatures,
    /// Left and right eye, declared only for stereo sessions.
    pub eyes: Option<[PoseFeatures; 2]>,
}

pub struct TrackingProvider {
    host: Box<dyn InputHost>,
    views: Box<dyn ViewsDataSource>,
    device_id: InputDeviceId,
    device_name: String,
    manufacturer: String,
    state: ProviderState,
    has_multiple_views: bool,
    connected: bool,
    features: Option<HeadFeatures>,
    latest_views: Option<ViewsData>,
}

impl TrackingProvider {
    pub fn new(
        host: Box<dyn InputHost>,
        views: Box<dyn ViewsDataSource>,
        prefs: &BridgePrefs,
    ) -> TrackingProvider {
        TrackingProvider {
            host,
            views,
            device_id: InputDeviceId(prefs.device_id),
            device_name: prefs.device_name.clone(),
            manufacturer: prefs.manufacturer.clone(),
            state: ProviderState::Uninitialized,
            has_multiple_views: true,
            connected: false,
            features: None,
            latest_views: None,
        }
    }

    pub fn device_id(&self) -> InputDeviceId {
        self.device_id
    }

    pub fn features(&self) -> Option<&HeadFeatures> {
        self.features.as_ref()
    }

    pub fn tick(&mut self, _update_type: InputUpdateType) -> Result<(), Error> {
        Ok(())
    }

    /// Declare the device schema. The order of the slots is part of the
    /// contract with the host.
    pub fn fill_device_definition(
        &mut self,
        id: InputDeviceId,
        definition: &mut dyn DeviceDefinition,
    ) -> Result<(), Error> {
        if id != self.device_id {
            return Ok(());
        }

        definition.set_name(&self.device_name);
        definition.set_characteristics(
            DeviceCharacteristics::HEAD_MOUNTED | DeviceCharacteristics::TRACKED_DEVICE,
        );
        definition.set_manufacturer(&self.manufacturer);

        let is_tracked =
            definition.add_feature("is tracked", FeatureType::Binary, FeatureUsage::IsTracked);
        let tracking_state = definition.add_feature(
            "tracking state",
            FeatureType::DiscreteStates,
            FeatureUsage::TrackingState,
        );
        let mut pose = |name: &str, position: FeatureUsage, rotation: FeatureUsage| PoseFeatures {
            position: definition.add_feature(
                &format!("{name} position"),
                FeatureType::Axis3D,
                position,
            ),
            rotation: definition.add_feature(
                &format!("{name} rotation"),
                FeatureType::Rotation,
                rotation,
            ),
        };
        let device = pose(
            "device",
            FeatureUsage::DevicePosition,
            FeatureUsage::DeviceRotation,
        );
        let center_eye = pose(
            "center eye",
            FeatureUsage::CenterEyePosition,
            FeatureUsage::CenterEyeRotation,
        );
        let eyes = self.has_multiple_views.then(|| {
            [
                pose(
                    "left eye",
                    FeatureUsage::LeftEyePosition,
                    FeatureUsage::LeftEyeRotation,
                ),
                pose(
                    "right eye",
                    FeatureUsage::RightEyePosition,
                    FeatureUsage::RightEyeRotation,
                ),
            ]
        });

        log::debug!(
            "Defined {} with {} eye slots",
            self.device_name,
            if eyes.is_some() { "stereo" } else { "no" }
        );
        self.features = Some(HeadFeatures {
            is_tracked,
            tracking_state,
            device,
            center_eye,
            eyes,
        });
        Ok(())
    }

    /// Write the current head and eye poses into the host's snapshot.
    pub fn update_device_state(
        &mut self,
        id: InputDeviceId,
        _update_type: InputUpdateType,
        state: &mut dyn DeviceState,
    ) -> Result<(), Error> {
        if id != self.device_id {
            return Ok(());
        }
        let features = self.features.ok_or(Error::NotReady)?;
        let views = match self.views.read() {
            Ok(views) => {
                self.latest_views = Some(views);
                views
            },
            Err(error) => {
                let Some(views) = self.latest_views else {
                    return Err(error);
                };
                log::warn!("Reusing the previous head pose: {error}");
                views
            },
        };

        let rotation = views.head_orientation;
        let center = views.center_eye_position();

        state.set_binary(features.is_tracked, true);
        state.set_discrete_state(
            features.tracking_state,
            (TrackingState::POSITION | TrackingState::ROTATION).bits(),
        );
        state.set_axis3d(features.device.position, center);
        state.set_rotation(features.device.rotation, rotation);
        state.set_axis3d(features.center_eye.position, center);
        state.set_rotation(features.center_eye.rotation, rotation);
        if let Some(eyes) = features.eyes {
            for (eye, position) in eyes.iter().zip(views.eye_positions) {
                state.set_axis3d(eye.position, position);
                state.set_rotation(eye.rotation, rotation);
            }
        }
        Ok(())
    }

    pub fn handle_event(
        &mut self,
        event_type: u32,
        _id: InputDeviceId,
        _payload: &[u8],
    ) -> Result<(), Error> {
        Err(Error::UnsupportedEvent(event_type))
    }

    /// Historic states are not kept; the host keeps what it already has.
    pub fn try_get_device_state_at_time(
        &mut self,
        _time: u64,
        _id: InputDeviceId,
        _state: &mut dyn DeviceState,
    ) -> Result<(), Error> {
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.host.device_disconnected(self.device_id);
            self.connected = false;
        }
    }
}

impl Provider for TrackingProvider {
    fn initialize(&mut self) -> Result<(), Error> {
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Error> {
        match self.views.read() {
            Ok(views) => {
                self.has_multiple_views = views.has_multiple_views();
                self.latest_views = Some(views);
            },
            Err(error) => log::warn!("Starting tracking without views data: {error}"),
        }
        self.host.device_connected(self.device_id);
        self.connected = true;
        self.state = ProviderState::Started;
        Ok(())
    }

    fn stop(&mut self) {
        self.disconnect();
        if self.state != ProviderState::Shutdown {
            self.state = ProviderState::Stopped;
        }
    }

    fn shutdown(&mut self) {
        self.disconnect();
        self.features = None;
        self.state = ProviderState::Shutdown;
    }

    fn state(&self) -> ProviderState {
        self.state
    }
}
