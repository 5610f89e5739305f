/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(unsafe_code)]

use std::num::NonZeroU32;
use std::rc::Rc;

use euclid::{Rect, Size2D};
use glow::{self as gl, Context as Gl, HasContext};
use webxr_bridge_api::{Error, Pixels, Uv};

use super::{CompositeSource, Compositor};

const VERTEX_ATTRIBUTE: u32 = 0;
const VERTICES: &[[f32; 2]; 4] = &[[-1.0, -1.0], [-1.0, 1.0], [1.0, -1.0], [1.0, 1.0]];

const QUAD_VERTEX_SHADER: &str = "#version 300 es
  layout(location=0) in vec2 coord;
  out vec2 vTexCoord;
  void main(void) {
    gl_Position = vec4(coord, 0.0, 1.0);
    vTexCoord = coord * 0.5 + 0.5;
  }
";

const QUAD_FRAGMENT_SHADER: &str = "#version 300 es
  precision mediump float;
  layout(location=0) out vec4 color;
  uniform sampler2D image;
  in vec2 vTexCoord;
  void main() {
    color = texture(image, vTexCoord);
  }
";

const QUAD_ARRAY_FRAGMENT_SHADER: &str = "#version 300 es
  precision mediump float;
  precision mediump sampler2DArray;
  layout(location=0) out vec4 color;
  uniform sampler2DArray image;
  uniform int layer;
  in vec2 vTexCoord;
  void main() {
    color = texture(image, vec3(vTexCoord, float(layer)));
  }
";

/// Bounds the loop draining errors left on the host's context, since a lost
/// context may keep reporting one.
const MAX_PENDING_ERRORS: usize = 16;

/// The full-screen quad and the programs drawing a texture onto it.
struct QuadPipeline {
    buffer: gl::NativeBuffer,
    vao: gl::NativeVertexArray,
    program: gl::NativeProgram,
    array_program: gl::NativeProgram,
    layer_location: Option<gl::NativeUniformLocation>,
}

/// Discard errors raised before we touched the context. Returns how many
/// were discarded.
fn drain_errors(mut get_error: impl FnMut() -> u32) -> usize {
    (0..MAX_PENDING_ERRORS)
        .take_while(|_| get_error() != gl::NO_ERROR)
        .count()
}

fn check_error(error: u32, operation: &str) -> Result<(), Error> {
    if error == gl::NO_ERROR {
        Ok(())
    } else {
        Err(Error::BackendSpecific(format!("{operation} raised GL error {error:#x}")))
    }
}

/// `rect` of a `size` target in GL viewport coordinates: x, y, width, height.
fn viewport_in_pixels(rect: Rect<f32, Uv>, size: Size2D<i32, Pixels>) -> [i32; 4] {
    let width = size.width as f32;
    let height = size.height as f32;
    [
        (rect.origin.x * width).round() as i32,
        (rect.origin.y * height).round() as i32,
        (rect.size.width * width).round() as i32,
        (rect.size.height * height).round() as i32,
    ]
}

/// The offscreen target a frame is composited into, sized to the framebuffer.
struct OffscreenTarget {
    framebuffer: gl::NativeFramebuffer,
    texture: gl::NativeTexture,
    size: Size2D<i32, Pixels>,
}

/// Draws the rendered eye texture into an offscreen framebuffer with a
/// full-screen quad.
pub struct GlCompositor {
    gl: Rc<Gl>,
    pipeline: Option<QuadPipeline>,
    target: Option<OffscreenTarget>,
}

impl GlCompositor {
    pub fn new(gl: Rc<Gl>) -> GlCompositor {
        GlCompositor {
            gl,
            pipeline: None,
            target: None,
        }
    }

    fn compile_shader(&self, kind: u32, source: &str) -> Result<gl::NativeShader, Error> {
        unsafe {
            let shader = self.gl.create_shader(kind).map_err(Error::BackendSpecific)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(Error::BackendSpecific(format!(
                    "Failed to compile shader: {log}"
                )));
            }
            Ok(shader)
        }
    }

    fn link_program(&self, fragment_source: &str) -> Result<gl::NativeProgram, Error> {
        let vertex_shader = self.compile_shader(gl::VERTEX_SHADER, QUAD_VERTEX_SHADER)?;
        let fragment_shader = match self.compile_shader(gl::FRAGMENT_SHADER, fragment_source) {
            Ok(shader) => shader,
            Err(error) => {
                unsafe { self.gl.delete_shader(vertex_shader) };
                return Err(error);
            },
        };

        unsafe {
            let program = match self.gl.create_program() {
                Ok(program) => program,
                Err(error) => {
                    self.gl.delete_shader(vertex_shader);
                    self.gl.delete_shader(fragment_shader);
                    return Err(Error::BackendSpecific(error));
                },
            };
            self.gl.attach_shader(program, vertex_shader);
            self.gl.attach_shader(program, fragment_shader);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vertex_shader);
            self.gl.detach_shader(program, fragment_shader);
            self.gl.delete_shader(vertex_shader);
            self.gl.delete_shader(fragment_shader);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(Error::BackendSpecific(format!("Failed to link: {log}")));
            }
            Ok(program)
        }
    }

    fn create_pipeline(&self) -> Result<QuadPipeline, Error> {
        drain_errors(|| unsafe { self.gl.get_error() });
        let program = self.link_program(QUAD_FRAGMENT_SHADER)?;
        let array_program = match self.link_program(QUAD_ARRAY_FRAGMENT_SHADER) {
            Ok(program) => program,
            Err(error) => {
                unsafe { self.gl.delete_program(program) };
                return Err(error);
            },
        };

        unsafe {
            let layer_location = self.gl.get_uniform_location(array_program, "layer");

            // The four corners of the window in a VAO, set to attribute 0
            let buffer = self.gl.create_buffer().map_err(Error::BackendSpecific)?;
            let vao = self.gl.create_vertex_array().map_err(Error::BackendSpecific)?;
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(gl::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                gl::ARRAY_BUFFER,
                bytemuck::cast_slice(VERTICES),
                gl::STATIC_DRAW,
            );
            self.gl.vertex_attrib_pointer_f32(
                VERTEX_ATTRIBUTE,
                VERTICES[0].len() as i32,
                gl::FLOAT,
                false,
                0,
                0,
            );
            self.gl.enable_vertex_attrib_array(VERTEX_ATTRIBUTE);
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(gl::ARRAY_BUFFER, None);

            let pipeline = QuadPipeline {
                buffer,
                vao,
                program,
                array_program,
                layer_location,
            };
            if let Err(error) = check_error(self.gl.get_error(), "Creating the quad pipeline") {
                self.delete_pipeline(pipeline);
                return Err(error);
            }
            Ok(pipeline)
        }
    }

    fn delete_pipeline(&self, pipeline: QuadPipeline) {
        unsafe {
            self.gl.delete_buffer(pipeline.buffer);
            self.gl.delete_vertex_array(pipeline.vao);
            self.gl.delete_program(pipeline.program);
            self.gl.delete_program(pipeline.array_program);
        }
    }

    fn create_target(&self, size: Size2D<i32, Pixels>) -> Result<OffscreenTarget, Error> {
        unsafe {
            let texture = self.gl.create_texture().map_err(Error::BackendSpecific)?;
            self.gl.bind_texture(gl::TEXTURE_2D, Some(texture));
            self.gl
                .tex_storage_2d(gl::TEXTURE_2D, 1, gl::RGBA8, size.width, size.height);
            self.gl.bind_texture(gl::TEXTURE_2D, None);

            let framebuffer = self.gl.create_framebuffer().map_err(Error::BackendSpecific)?;
            self.gl.bind_framebuffer(gl::FRAMEBUFFER, Some(framebuffer));
            self.gl.framebuffer_texture_2d(
                gl::FRAMEBUFFER,
                gl::COLOR_ATTACHMENT0,
                gl::TEXTURE_2D,
                Some(texture),
                0,
            );
            let status = self.gl.check_framebuffer_status(gl::FRAMEBUFFER);
            self.gl.bind_framebuffer(gl::FRAMEBUFFER, None);
            if status != gl::FRAMEBUFFER_COMPLETE {
                self.gl.delete_framebuffer(framebuffer);
                self.gl.delete_texture(texture);
                return Err(Error::BackendSpecific(format!(
                    "Incomplete composite framebuffer: {status:#x}"
                )));
            }

            log::debug!("Created composite target {}x{}", size.width, size.height);
            Ok(OffscreenTarget {
                framebuffer,
                texture,
                size,
            })
        }
    }

    fn delete_target(&mut self) {
        if let Some(target) = self.target.take() {
            unsafe {
                self.gl.delete_framebuffer(target.framebuffer);
                self.gl.delete_texture(target.texture);
            }
        }
    }
}

impl Compositor for GlCompositor {
    fn owns_presentation(&self) -> bool {
        true
    }

    fn prepare(&mut self) -> Result<(), Error> {
        if self.pipeline.is_none() {
            self.pipeline = Some(self.create_pipeline()?);
        }
        Ok(())
    }

    fn composite(
        &mut self,
        sources: &[CompositeSource],
        target_size: Size2D<i32, Pixels>,
    ) -> Result<(), Error> {
        if target_size.width <= 0 || target_size.height <= 0 {
            return Err(Error::NotReady);
        }
        self.prepare()?;
        if self.target.as_ref().map(|target| target.size) != Some(target_size) {
            self.delete_target();
            self.target = Some(self.create_target(target_size)?);
        }
        let (Some(pipeline), Some(target)) = (self.pipeline.as_ref(), self.target.as_ref()) else {
            return Err(Error::NotReady);
        };

        let discarded = drain_errors(|| unsafe { self.gl.get_error() });
        if discarded > 0 {
            log::debug!("Discarded {discarded} GL error(s) left on the context");
        }

        unsafe {
            self.gl
                .bind_framebuffer(gl::FRAMEBUFFER, Some(target.framebuffer));
            self.gl
                .viewport(0, 0, target_size.width, target_size.height);
            self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
            self.gl.clear(gl::COLOR_BUFFER_BIT);
            self.gl.bind_vertex_array(Some(pipeline.vao));
            self.gl.active_texture(gl::TEXTURE0);

            for source in sources {
                let texture = source
                    .native_texture
                    .and_then(NonZeroU32::new)
                    .map(gl::NativeTexture);
                let [x, y, width, height] = viewport_in_pixels(source.dest_rect, target_size);
                self.gl.viewport(x, y, width, height);
                let texture_target = match source.array_layer {
                    Some(layer) => {
                        self.gl.use_program(Some(pipeline.array_program));
                        self.gl
                            .uniform_1_i32(pipeline.layer_location.as_ref(), layer as i32);
                        gl::TEXTURE_2D_ARRAY
                    },
                    None => {
                        self.gl.use_program(Some(pipeline.program));
                        gl::TEXTURE_2D
                    },
                };
                self.gl.bind_texture(texture_target, texture);
                self.gl
                    .draw_arrays(gl::TRIANGLE_STRIP, 0, VERTICES.len() as i32);
                self.gl.bind_texture(texture_target, None);
            }

            self.gl.bind_vertex_array(None);
            self.gl.use_program(None);
            self.gl.bind_framebuffer(gl::FRAMEBUFFER, None);
            check_error(self.gl.get_error(), "Compositing the frame")
        }
    }

    fn release(&mut self) {
        self.delete_target();
        if let Some(pipeline) = self.pipeline.take() {
            self.delete_pipeline(pipeline);
        }
    }
}

impl Drop for GlCompositor {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod test {
    use euclid::Point2D;

    use super::*;

    #[test]
    fn test_pending_errors_are_drained() {
        let mut pending = vec![gl::INVALID_OPERATION, gl::INVALID_ENUM];
        let drained = drain_errors(|| pending.pop().unwrap_or(gl::NO_ERROR));
        assert_eq!(drained, 2);
    }

    #[test]
    fn test_draining_a_stuck_context_terminates() {
        let drained = drain_errors(|| gl::OUT_OF_MEMORY);
        assert_eq!(drained, MAX_PENDING_ERRORS);
    }

    #[test]
    fn test_draw_errors_become_results() {
        assert_eq!(check_error(gl::NO_ERROR, "Draw"), Ok(()));
        assert!(matches!(
            check_error(gl::INVALID_OPERATION, "Draw"),
            Err(Error::BackendSpecific(_))
        ));
    }

    #[test]
    fn test_eye_viewports() {
        let size = Size2D::new(1682, 706);
        let right = Rect::new(Point2D::new(0.5, 0.0), Size2D::new(0.5, 1.0));
        assert_eq!(viewport_in_pixels(right, size), [841, 0, 841, 706]);
        let full = Rect::new(Point2D::zero(), Size2D::new(1.0, 1.0));
        assert_eq!(viewport_in_pixels(full, size), [0, 0, 1682, 706]);
    }
}
