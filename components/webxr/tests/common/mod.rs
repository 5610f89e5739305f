/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use euclid::{Point2D, Rect, Rotation3D, Size2D, Vector3D};
use webxr_bridge::api::mock::{MockViewsData, MockViewsSource};
use webxr_bridge::api::{
    AppSetup, DeviceCharacteristics, DeviceDefinition, DeviceState, DisplayHost, Error,
    FeatureIndex, FeatureType, FeatureUsage, FrameSetupHints, HintsChanged, InputDeviceId,
    InputHost, Native, NextFrameDesc, Pixels, RenderTextureDesc, RenderTextureId,
};
use webxr_bridge::compositor::{CompositeSource, Compositor};
use webxr_bridge::{BridgePrefs, DisplayProvider, Provider, TrackingProvider};

#[derive(Debug, Default)]
pub struct TextureLog {
    pub created: Vec<(RenderTextureId, RenderTextureDesc)>,
    pub destroyed: Vec<RenderTextureId>,
    /// Fail the creation call with this index, counting from zero.
    pub fail_on_call: Option<usize>,
    /// Hand out the null texture instead of failing.
    pub return_null: bool,
    calls: usize,
}

impl TextureLog {
    pub fn live(&self) -> Vec<RenderTextureId> {
        self.created
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !self.destroyed.contains(id))
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingDisplayHost(pub Rc<RefCell<TextureLog>>);

impl DisplayHost for RecordingDisplayHost {
    fn create_texture(&mut self, desc: &RenderTextureDesc) -> Result<RenderTextureId, Error> {
        let mut log = self.0.borrow_mut();
        let call = log.calls;
        log.calls += 1;
        if log.fail_on_call == Some(call) {
            return Err(Error::TextureAllocation("out of memory".to_owned()));
        }
        if log.return_null {
            return Ok(RenderTextureId(0));
        }
        let id = RenderTextureId(100 + call as u32);
        log.created.push((id, *desc));
        Ok(id)
    }

    fn destroy_texture(&mut self, id: RenderTextureId) {
        self.0.borrow_mut().destroyed.push(id);
    }

    fn native_texture(&self, id: RenderTextureId) -> Option<u32> {
        Some(id.0 + 1000)
    }
}

#[derive(Debug, Default)]
pub struct CompositorLog {
    pub owns_presentation: bool,
    pub prepared: usize,
    pub composites: Vec<(Vec<CompositeSource>, Size2D<i32, Pixels>)>,
    pub released: usize,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingCompositor(pub Rc<RefCell<CompositorLog>>);

impl Compositor for RecordingCompositor {
    fn owns_presentation(&self) -> bool {
        self.0.borrow().owns_presentation
    }

    fn prepare(&mut self) -> Result<(), Error> {
        self.0.borrow_mut().prepared += 1;
        Ok(())
    }

    fn composite(
        &mut self,
        sources: &[CompositeSource],
        target_size: Size2D<i32, Pixels>,
    ) -> Result<(), Error> {
        self.0.borrow_mut().composites.push((sources.to_vec(), target_size));
        Ok(())
    }

    fn release(&mut self) {
        self.0.borrow_mut().released += 1;
    }
}

pub struct DisplayFixture {
    pub provider: DisplayProvider,
    pub views: MockViewsSource,
    pub host: RecordingDisplayHost,
    pub compositor: RecordingCompositor,
}

impl DisplayFixture {
    pub fn new(views: MockViewsData, prefs: &BridgePrefs) -> DisplayFixture {
        let source = MockViewsSource::new(views);
        let host = RecordingDisplayHost::default();
        let compositor = RecordingCompositor::default();
        let provider = DisplayProvider::new(
            Box::new(host.clone()),
            Box::new(source.clone()),
            Box::new(compositor.clone()),
            prefs,
        );
        DisplayFixture {
            provider,
            views: source,
            host,
            compositor,
        }
    }

    /// Initialized, started, and past the skipped first frame.
    pub fn rendering(views: MockViewsData, prefs: &BridgePrefs) -> DisplayFixture {
        let mut fixture = DisplayFixture::new(views, prefs);
        fixture.provider.initialize().unwrap();
        fixture.provider.start().unwrap();
        let mut skipped = NextFrameDesc::default();
        fixture
            .provider
            .populate_next_frame_desc(&multi_pass(), &mut skipped)
            .unwrap();
        fixture
    }

    pub fn frame(&mut self, hints: &FrameSetupHints) -> Result<NextFrameDesc, Error> {
        let mut desc = NextFrameDesc::default();
        self.provider.populate_next_frame_desc(hints, &mut desc)?;
        Ok(desc)
    }
}

pub fn per_view() -> BridgePrefs {
    BridgePrefs {
        texture_layout: webxr_bridge::TextureLayout::PerView,
        ..BridgePrefs::default()
    }
}

pub fn multi_pass() -> FrameSetupHints {
    FrameSetupHints::default()
}

pub fn single_pass() -> FrameSetupHints {
    FrameSetupHints {
        app_setup: AppSetup {
            single_pass_rendering: true,
            ..AppSetup::default()
        },
        changed: HintsChanged::empty(),
    }
}

pub fn with_changes(mut hints: FrameSetupHints, changed: HintsChanged) -> FrameSetupHints {
    hints.changed = changed;
    hints
}

pub fn uv(x: f32, y: f32, width: f32, height: f32) -> Rect<f32, webxr_bridge::api::Uv> {
    Rect::new(Point2D::new(x, y), Size2D::new(width, height))
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Connected(InputDeviceId),
    Disconnected(InputDeviceId),
}

#[derive(Clone, Debug, Default)]
pub struct RecordingInputHost(pub Rc<RefCell<Vec<InputEvent>>>);

impl InputHost for RecordingInputHost {
    fn device_connected(&mut self, id: InputDeviceId) {
        self.0.borrow_mut().push(InputEvent::Connected(id));
    }

    fn device_disconnected(&mut self, id: InputDeviceId) {
        self.0.borrow_mut().push(InputEvent::Disconnected(id));
    }
}

/// Hands out indices that do not match declaration positions, so callers
/// have to use what they were given.
#[derive(Debug, Default)]
pub struct RecordingDefinition {
    pub name: Option<String>,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
    pub characteristics: DeviceCharacteristics,
    pub features: Vec<(String, FeatureType, FeatureUsage)>,
}

pub const FIRST_FEATURE_INDEX: u32 = 40;

impl RecordingDefinition {
    pub fn index_of(&self, usage: FeatureUsage) -> Option<FeatureIndex> {
        self.features
            .iter()
            .position(|(_, _, u)| *u == usage)
            .map(|position| FeatureIndex(FIRST_FEATURE_INDEX + position as u32))
    }
}

impl DeviceDefinition for RecordingDefinition {
    fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_owned());
    }

    fn set_manufacturer(&mut self, manufacturer: &str) {
        self.manufacturer = Some(manufacturer.to_owned());
    }

    fn set_serial_number(&mut self, serial_number: &str) {
        self.serial_number = Some(serial_number.to_owned());
    }

    fn set_characteristics(&mut self, characteristics: DeviceCharacteristics) {
        self.characteristics = characteristics;
    }

    fn add_feature(
        &mut self,
        name: &str,
        feature_type: FeatureType,
        usage: FeatureUsage,
    ) -> FeatureIndex {
        self.features.push((name.to_owned(), feature_type, usage));
        FeatureIndex(FIRST_FEATURE_INDEX + self.features.len() as u32 - 1)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateWrite {
    Binary(FeatureIndex, bool),
    Discrete(FeatureIndex, u32),
    Axis3D(FeatureIndex, Vector3D<f32, Native>),
    Rotation(FeatureIndex, Rotation3D<f32, Native, Native>),
}

#[derive(Debug, Default)]
pub struct RecordingState {
    pub writes: Vec<StateWrite>,
}

impl RecordingState {
    pub fn axis3d(&self, index: FeatureIndex) -> Option<Vector3D<f32, Native>> {
        self.writes.iter().find_map(|write| match *write {
            StateWrite::Axis3D(i, value) if i == index => Some(value),
            _ => None,
        })
    }

    pub fn rotation(&self, index: FeatureIndex) -> Option<Rotation3D<f32, Native, Native>> {
        self.writes.iter().find_map(|write| match *write {
            StateWrite::Rotation(i, value) if i == index => Some(value),
            _ => None,
        })
    }
}

impl DeviceState for RecordingState {
    fn set_binary(&mut self, index: FeatureIndex, value: bool) {
        self.writes.push(StateWrite::Binary(index, value));
    }

    fn set_discrete_state(&mut self, index: FeatureIndex, value: u32) {
        self.writes.push(StateWrite::Discrete(index, value));
    }

    fn set_axis3d(&mut self, index: FeatureIndex, value: Vector3D<f32, Native>) {
        self.writes.push(StateWrite::Axis3D(index, value));
    }

    fn set_rotation(&mut self, index: FeatureIndex, value: Rotation3D<f32, Native, Native>) {
        self.writes.push(StateWrite::Rotation(index, value));
    }
}

pub struct TrackingFixture {
    pub provider: TrackingProvider,
    pub views: MockViewsSource,
    pub host: RecordingInputHost,
}

impl TrackingFixture {
    pub fn started(views: MockViewsData) -> TrackingFixture {
        TrackingFixture::started_with(views, &BridgePrefs::default())
    }

    pub fn started_with(views: MockViewsData, prefs: &BridgePrefs) -> TrackingFixture {
        let source = MockViewsSource::new(views);
        let host = RecordingInputHost::default();
        let mut provider =
            TrackingProvider::new(Box::new(host.clone()), Box::new(source.clone()), prefs);
        provider.initialize().unwrap();
        provider.start().unwrap();
        TrackingFixture {
            provider,
            views: source,
            host,
        }
    }

    pub fn define(&mut self) -> RecordingDefinition {
        let mut definition = RecordingDefinition::default();
        let id = self.provider.device_id();
        self.provider
            .fill_device_definition(id, &mut definition)
            .unwrap();
        definition
    }
}
