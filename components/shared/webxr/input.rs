/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use bitflags::bitflags;
use euclid::{Rotation3D, Vector3D};

use crate::Native;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InputDeviceId(pub u32);

/// Index of a feature slot, handed out by the host when the slot is declared.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FeatureIndex(pub u32);

/// When the host samples device state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputUpdateType {
    Dynamic,
    BeforeRender,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct DeviceCharacteristics: u32 {
        const HEAD_MOUNTED = 1 << 0;
        const CAMERA = 1 << 1;
        const HELD_IN_HAND = 1 << 2;
        const HAND_TRACKING = 1 << 3;
        const EYE_TRACKING = 1 << 4;
        const TRACKED_DEVICE = 1 << 5;
        const CONTROLLER = 1 << 6;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct TrackingState: u32 {
        const POSITION = 1 << 0;
        const ROTATION = 1 << 1;
        const VELOCITY = 1 << 2;
        const ANGULAR_VELOCITY = 1 << 3;
        const ACCELERATION = 1 << 4;
        const ANGULAR_ACCELERATION = 1 << 5;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum FeatureType {
    Custom = 0,
    Binary,
    DiscreteStates,
    Axis1D,
    Axis2D,
    Axis3D,
    Rotation,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum FeatureUsage {
    IsTracked = 0,
    TrackingState,
    DevicePosition,
    DeviceRotation,
    CenterEyePosition,
    CenterEyeRotation,
    LeftEyePosition,
    LeftEyeRotation,
    RightEyePosition,
    RightEyeRotation,
}

/// The schema of an input device, declared once when the device connects.
pub trait DeviceDefinition {
    fn set_name(&mut self, name: &str);
    fn set_manufacturer(&mut self, manufacturer: &str);
    fn set_serial_number(&mut self, serial_number: &str);
    fn set_characteristics(&mut self, characteristics: DeviceCharacteristics);
    fn add_feature(
        &mut self,
        name: &str,
        feature_type: FeatureType,
        usage: FeatureUsage,
    ) -> FeatureIndex;
}

/// Host storage for a device snapshot, written slot by slot.
pub trait DeviceState {
    fn set_binary(&mut self, index: FeatureIndex, value: bool);
    fn set_discrete_state(&mut self, index: FeatureIndex, value: u32);
    fn set_axis3d(&mut self, index: FeatureIndex, value: Vector3D<f32, Native>);
    fn set_rotation(&mut self, index: FeatureIndex, value: Rotation3D<f32, Native, Native>);
}
