//! GLSL shader sources and compilation helpers for the glow backend.
//!
//! The shaders target GLSL 1.40. Drawing from the in-buffer draw-indirect
//! header additionally needs `glDrawArraysIndirect` (OpenGL 4.0 or
//! `ARB_draw_indirect`).

use glow::HasContext;

/// Attribute location of the position stream.
pub const POSITION_LOCATION: u32 = 0;
/// Attribute location of the fringe stream.
pub const FRINGE_LOCATION: u32 = 1;
/// Attribute location of the color stream.
pub const COLOR_LOCATION: u32 = 2;

/// Attribute names bound to their locations before linking.
pub const ATTRIBUTES: [(u32, &str); 3] = [
    (POSITION_LOCATION, "a_position"),
    (FRINGE_LOCATION, "a_fringe"),
    (COLOR_LOCATION, "a_color"),
];

/// Vertex shader for fills, fill edges and strokes.
///
/// # Uniforms
///
/// | Name           | Type   | Description                              |
/// |----------------|--------|------------------------------------------|
/// | `u_scale`      | `vec2` | Polygon scale                            |
/// | `u_offset`     | `vec2` | Polygon translation                      |
/// | `u_resolution` | `vec2` | Viewport size in pixels                  |
pub const POLYGON_VERTEX_SRC: &str = r"#version 140

in vec2 a_position;
in vec2 a_fringe;
in vec4 a_color;

uniform vec2 u_scale;
uniform vec2 u_offset;
uniform vec2 u_resolution;

out vec2 v_fringe;
out vec4 v_color;

void main() {
    v_fringe = a_fringe;
    v_color = a_color;

    vec2 world = u_offset + u_scale * a_position;

    // [0, resolution] to [-1, 1], y down
    vec2 ndc = (world / u_resolution) * 2.0 - 1.0;
    ndc.y = -ndc.y;

    gl_Position = vec4(ndc, 0.0, 1.0);
}
";

/// Fragment shader for fills, fill edges and strokes.
///
/// The fringe attribute holds `(coord, mult)`; coverage is
/// `min(1, (1 - |2 * coord - 1|) * mult)`. Output is premultiplied.
///
/// # Uniforms
///
/// | Name             | Type   | Description                            |
/// |------------------|--------|----------------------------------------|
/// | `u_color`        | `vec4` | Color when no per-vertex colors are bound |
/// | `u_vertex_color` | `bool` | Use the per-vertex color stream        |
/// | `u_antialias`    | `bool` | Apply fringe coverage                  |
pub const POLYGON_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_fringe;
in vec4 v_color;

uniform vec4 u_color;
uniform bool u_vertex_color;
uniform bool u_antialias;

out vec4 frag_color;

void main() {
    frag_color = u_vertex_color ? v_color : u_color;

    if (u_antialias) {
        float coverage = (1.0 - abs(2.0 * v_fringe.x - 1.0)) * v_fringe.y;
        frag_color.a *= min(1.0, coverage);
    }

    frag_color.rgb *= frag_color.a;
}
";

/// Compile a shader program from vertex and fragment source strings,
/// binding `attributes` to their locations before linking.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns a descriptive error string if shader compilation or program
/// linking fails.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
    attributes: &[(u32, &str)],
) -> Result<glow::Program, String> {
    let program = unsafe { gl.create_program() }?;

    let vs = unsafe { compile_shader(gl, glow::VERTEX_SHADER, vertex_src) }?;
    let fs = match unsafe { compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) } {
        Ok(fs) => fs,
        Err(err) => {
            unsafe {
                gl.delete_shader(vs);
                gl.delete_program(program);
            }
            return Err(err);
        }
    };

    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        for &(location, name) in attributes {
            gl.bind_attrib_location(program, location, name);
        }
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(format!("Program link error: {log}"));
        }

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
    }

    Ok(program)
}

/// Compile a single shader stage from source.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, String> {
    unsafe {
        let shader = gl.create_shader(shader_type)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(format!("Shader compile error: {log}"));
        }

        Ok(shader)
    }
}
