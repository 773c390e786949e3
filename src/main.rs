//! Spinning-cube viewer.
//!
//! ```bash
//! cargo run --release --bin spin
//! ```
//!
//! Keys: `1` flat, `2` Gouraud, `T` toggle texture, `C` cycle culling,
//! `Esc` quits.

use std::time::Instant;

use glam::{Mat4, Vec2, Vec3};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use tinyrast::{BoundingBox, Image, Material, Mesh3, Pixel, Renderer, Rgb, Rgba8888, Shader};

const WIDTH: usize = 480;
const HEIGHT: usize = 360;

/// Cube with per-face normals and corner UVs, packed as one chain per face.
struct CubeData {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    faces: Vec<u16>,
}

fn build_cube() -> CubeData {
    // Four corners per face so each face keeps its own flat normal.
    let face_corners = [
        // +Z
        [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
        // -Z
        [
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
        ],
        // +X
        [
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ],
        // -X
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
        // +Y
        [
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
        // -Y
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ],
    ];
    let face_normals = [
        Vec3::Z,
        Vec3::NEG_Z,
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
    ];

    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let texcoords = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];

    for (f, corners) in face_corners.iter().enumerate() {
        let base = vertices.len() as u16;
        vertices.extend_from_slice(corners);
        let nid = f as u16;
        // One chain of two triangles: (0,1,2) then keep 0 and 2, add 3.
        faces.extend_from_slice(&[
            2,
            base,
            0,
            nid,
            base + 1,
            1,
            nid,
            base + 2,
            2,
            nid,
            base + 3,
            3,
            nid,
        ]);
    }
    faces.push(0);

    CubeData {
        vertices,
        normals: face_normals.to_vec(),
        texcoords,
        faces,
    }
}

fn checkerboard(size: usize) -> Image<Rgba8888> {
    let mut tex = Image::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let c = if ((x / 4) ^ (y / 4)) & 1 == 0 {
                Rgb::new(0.9, 0.85, 0.7)
            } else {
                Rgb::new(0.3, 0.35, 0.5)
            };
            tex.set(x, y, Rgba8888::from_rgb(c));
        }
    }
    tex
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cube = build_cube();
    let texture = checkerboard(32);
    debug_assert!(texture.pow2_dims());
    let mesh = Mesh3 {
        vertices: &cube.vertices,
        normals: Some(&cube.normals),
        texcoords: Some(&cube.texcoords),
        texture: Some(&texture),
        faces: &cube.faces,
        bounds: BoundingBox {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
            zmin: -1.0,
            zmax: 1.0,
        },
        material: Material {
            color: Rgb::new(0.8, 0.3, 0.25),
            ..Material::default()
        },
        next: None,
    };

    let mut fb = Image::<Rgba8888>::new(WIDTH, HEIGHT);
    let mut zbuf = vec![0.0_f32; WIDTH * HEIGHT];

    let mut renderer = Renderer::<Rgba8888, WIDTH, HEIGHT, true, false>::new();
    renderer.set_perspective(
        45f32.to_radians(),
        WIDTH as f32 / HEIGHT as f32,
        1.0,
        100.0,
    );
    renderer.set_look_at(Vec3::new(0.0, 1.5, 4.5), Vec3::ZERO, Vec3::Y);
    renderer.set_light(
        Vec3::new(-1.0, -1.0, -1.0),
        Rgb::new(0.35, 0.35, 0.35),
        Rgb::WHITE,
        Rgb::WHITE,
    );

    renderer.set_target(&mut fb);
    renderer.set_depth_buffer(&mut zbuf);

    let mut window = Window::new(
        "tinyrast - spinning cube",
        WIDTH,
        HEIGHT,
        WindowOptions::default(),
    )?;
    window.set_target_fps(60);

    let mut shader = Shader::GOURAUD | Shader::TEXTURE;
    let mut culling = 1;
    let start = Instant::now();
    let mut frames = 0_u32;
    let mut last_report = Instant::now();
    let mut scratch = vec![0_u32; WIDTH * HEIGHT];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if window.is_key_pressed(Key::Key1, KeyRepeat::No) {
            shader = (shader - Shader::GOURAUD) | Shader::FLAT;
        }
        if window.is_key_pressed(Key::Key2, KeyRepeat::No) {
            shader |= Shader::GOURAUD;
        }
        if window.is_key_pressed(Key::T, KeyRepeat::No) {
            shader ^= Shader::TEXTURE;
        }
        if window.is_key_pressed(Key::C, KeyRepeat::No) {
            culling = match culling {
                1 => -1,
                -1 => 0,
                _ => 1,
            };
            println!("culling: {culling}");
        }

        let t = start.elapsed().as_secs_f32();
        if let Some(target) = renderer.target_mut() {
            target.clear(Rgba8888(0xff10_1018));
        }
        renderer.clear_depth_buffer();
        renderer.set_culling(culling);
        renderer.set_model(Mat4::from_rotation_y(t * 0.8) * Mat4::from_rotation_x(t * 0.3));
        renderer.draw_mesh(shader, &mesh, true, true)?;

        if let Some(target) = renderer.target() {
            for (dst, src) in scratch.iter_mut().zip(target.pixels()) {
                *dst = src.0;
            }
        }
        window.update_with_buffer(&scratch, WIDTH, HEIGHT)?;

        frames += 1;
        if last_report.elapsed().as_secs() >= 2 {
            println!(
                "{:.1} fps ({shader:?})",
                frames as f32 / last_report.elapsed().as_secs_f32()
            );
            frames = 0;
            last_report = Instant::now();
        }
    }
    Ok(())
}
