//! End-to-end pipeline properties, exercised through the public API only.
//!
//! Everything here is deterministic: fixed geometry, fixed state, exact
//! pixel assertions wherever the rasterization rule pins the result down.

use glam::{Mat4, Vec3};

use tinyrast::{BoundingBox, Image, Material, Mesh3, Renderer, Rgb, Rgba8888, Shader};

const BG: u32 = 0;
const WHITE: u32 = 0xffff_ffff;
const RED: u32 = 0xffff_0000;

fn count(im: &Image<Rgba8888>, px: u32) -> usize {
    im.pixels().iter().filter(|p| p.0 == px).count()
}

/// Ambient-only lighting: the rendered color is exactly the material color.
fn ambient_only<P, const LX: usize, const LY: usize, const ZB: bool, const ORTHO: bool>(
    r: &mut Renderer<'_, P, LX, LY, ZB, ORTHO>,
) where
    P: tinyrast::Pixel,
{
    r.set_light(
        Vec3::new(-1.0, -1.0, -1.0),
        Rgb::WHITE,
        Rgb::BLACK,
        Rgb::BLACK,
    );
    r.set_material_ambient_strength(1.0);
    r.set_material_color(Rgb::WHITE);
}

#[test]
fn identity_transforms_give_analytic_pixel_count() {
    const L: usize = 512;
    let mut fb = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, false>::new();
        r.set_target(&mut fb);
        r.set_view(Mat4::IDENTITY);
        r.set_model(Mat4::IDENTITY);
        r.set_perspective(45f32.to_radians(), 1.0, 1.0, 10.0);
        ambient_only(&mut r);
        r.draw_triangle(
            Shader::FLAT,
            [
                Vec3::new(-1.0, -1.0, -2.0),
                Vec3::new(1.0, -1.0, -2.0),
                Vec3::new(0.0, 1.0, -2.0),
            ],
            None,
            None,
            None,
        )
        .unwrap();
    }

    // Projected triangle corners land at ±(f/2) in NDC with f = cot(22.5°),
    // so the visible region is the triangle clipped to the unit square:
    //   area = 2 − (a−1)²/2 + 2(a−1),  a = f/2
    let a = 1.0 / (22.5f32.to_radians()).tan() / 2.0;
    let area_ndc = 2.0 - (a - 1.0) * (a - 1.0) / 2.0 + 2.0 * (a - 1.0);
    let expected = area_ndc * (L as f32 / 2.0) * (L as f32 / 2.0);

    let got = count(&fb, WHITE) as f32;
    assert!(
        (got - expected).abs() / expected < 0.01,
        "got {got}, expected {expected}"
    );
}

#[test]
fn depth_test_is_draw_order_independent() {
    const L: usize = 32;
    let far = [
        Vec3::new(-0.5, -0.5, -5.0),
        Vec3::new(0.5, -0.5, -5.0),
        Vec3::new(0.5, 0.5, -5.0),
        Vec3::new(-0.5, 0.5, -5.0),
    ];
    let near = far.map(|v| Vec3::new(v.x, v.y, -2.0));

    for order in [[far, near], [near, far]] {
        let mut fb = Image::<Rgba8888>::new(L, L);
        let mut zb = vec![0.0_f32; L * L];
        {
            let mut r = Renderer::<Rgba8888, L, L, true, true>::new();
            r.set_target(&mut fb);
            r.set_depth_buffer(&mut zb);
            r.clear_depth_buffer();
            r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
            ambient_only(&mut r);

            let colors = if order[0] == far {
                [Rgb::WHITE, Rgb::new(1.0, 0.0, 0.0)]
            } else {
                [Rgb::new(1.0, 0.0, 0.0), Rgb::WHITE]
            };
            for (quad, color) in order.iter().zip(colors) {
                r.set_material_color(color);
                r.draw_quad(Shader::FLAT, *quad, None, None, None).unwrap();
            }
        }
        // The near quad is red in both orders; the far white one never shows.
        assert_eq!(count(&fb, WHITE), 0);
        assert_eq!(count(&fb, RED), 16 * 16);
    }
}

#[test]
fn backface_culling_follows_winding_and_direction() {
    const L: usize = 32;
    let ccw = [
        Vec3::new(-0.5, -0.5, -2.0),
        Vec3::new(0.5, -0.5, -2.0),
        Vec3::new(0.0, 0.5, -2.0),
    ];
    let cw = [ccw[0], ccw[2], ccw[1]];

    let render = |tri: [Vec3; 3], culling: i32| -> usize {
        let mut fb = Image::<Rgba8888>::new(L, L);
        {
            let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
            r.set_target(&mut fb);
            r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
            r.set_culling(culling);
            ambient_only(&mut r);
            r.draw_triangle(Shader::FLAT, tri, None, None, None).unwrap();
        }
        count(&fb, WHITE)
    };

    assert!(render(ccw, 1) > 0);
    assert_eq!(render(cw, 1), 0);
    assert!(render(cw, -1) > 0);
    assert_eq!(render(ccw, -1), 0);
    assert!(render(ccw, 0) > 0);
    assert!(render(cw, 0) > 0);
}

#[test]
fn camera_plane_vertices_drop_the_whole_primitive() {
    const L: usize = 32;
    for z in [0.0, 0.5, 2.0] {
        let mut fb = Image::<Rgba8888>::new(L, L);
        {
            let mut r = Renderer::<Rgba8888, L, L, false, false>::new();
            r.set_target(&mut fb);
            r.set_perspective(45f32.to_radians(), 1.0, 1.0, 10.0);
            r.set_culling(0);
            ambient_only(&mut r);
            r.draw_triangle(
                Shader::FLAT,
                [
                    Vec3::new(-1.0, -1.0, -3.0),
                    Vec3::new(1.0, -1.0, -3.0),
                    // one vertex on or behind the camera plane
                    Vec3::new(0.0, 1.0, z),
                ],
                None,
                None,
                None,
            )
            .unwrap();
        }
        assert_eq!(count(&fb, BG), L * L, "z = {z}");
    }
}

/// Both projections refuse geometry on the camera plane, so the pixel sets
/// agree (and are empty).
#[test]
fn ortho_and_perspective_agree_on_camera_plane_geometry() {
    const L: usize = 32;
    let tri = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];

    let mut fb_o = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
        r.set_target(&mut fb_o);
        r.set_ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        r.set_culling(0);
        ambient_only(&mut r);
        r.draw_triangle(Shader::FLAT, tri, None, None, None).unwrap();
    }

    let mut fb_p = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, false>::new();
        r.set_target(&mut fb_p);
        r.set_frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 3.0);
        r.set_culling(0);
        ambient_only(&mut r);
        r.draw_triangle(Shader::FLAT, tri, None, None, None).unwrap();
    }

    assert_eq!(fb_o.pixels(), fb_p.pixels());
    assert_eq!(count(&fb_o, BG), L * L);
}

/// At the shared near plane the two projections place vertices identically,
/// so a nonempty triangle covers the same pixels under both.
#[test]
fn ortho_and_perspective_agree_at_the_near_plane() {
    const L: usize = 64;
    let tri = [
        Vec3::new(-0.8, -0.8, -1.0),
        Vec3::new(0.8, -0.8, -1.0),
        Vec3::new(0.0, 0.6, -1.0),
    ];

    let mut fb_o = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
        r.set_target(&mut fb_o);
        r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 3.0);
        ambient_only(&mut r);
        r.draw_triangle(Shader::FLAT, tri, None, None, None).unwrap();
    }

    let mut fb_p = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, false>::new();
        r.set_target(&mut fb_p);
        r.set_frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 3.0);
        ambient_only(&mut r);
        r.draw_triangle(Shader::FLAT, tri, None, None, None).unwrap();
    }

    assert!(count(&fb_o, WHITE) > 0);
    assert_eq!(fb_o.pixels(), fb_p.pixels());
}

/// Fan of four triangles around vertex 0, with per-vertex normal records.
fn fan_vertices() -> (Vec<Vec3>, Vec<Vec3>) {
    let mut verts = vec![Vec3::new(0.0, 0.0, -2.0)];
    for k in 0..5 {
        let ang = 0.3 + k as f32 * 0.9;
        verts.push(Vec3::new(ang.cos() * 0.8, ang.sin() * 0.8, -2.0));
    }
    let normals = vec![Vec3::Z; 6];
    (verts, normals)
}

fn render_fan(faces: &[u16]) -> Image<Rgba8888> {
    const L: usize = 64;
    let (verts, normals) = fan_vertices();
    let mesh = Mesh3 {
        vertices: &verts,
        normals: Some(&normals),
        texcoords: None,
        texture: None,
        faces,
        bounds: BoundingBox::default(),
        material: Material::default(),
        next: None,
    };
    let mut fb = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
        r.set_target(&mut fb);
        r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
        r.set_culling(0);
        r.draw_mesh(Shader::GOURAUD, &mesh, false, false).unwrap();
    }
    fb
}

#[test]
fn one_chain_matches_single_triangle_chains() {
    // One chain of four triangles: (0,1,2) then successors that keep the
    // fan apex (bit 15 clear retires the middle slot).
    #[rustfmt::skip]
    let chained: Vec<u16> = vec![
        4,
        0, 0,  1, 1,  2, 2,
        3, 3,
        4, 4,
        5, 5,
        0,
    ];
    // The same four triangles as four one-triangle chains.
    #[rustfmt::skip]
    let degenerate: Vec<u16> = vec![
        1, 0, 0,  1, 1,  2, 2,
        1, 0, 0,  2, 2,  3, 3,
        1, 0, 0,  3, 3,  4, 4,
        1, 0, 0,  4, 4,  5, 5,
        0,
    ];

    let a = render_fan(&chained);
    let b = render_fan(&degenerate);
    assert!(count(&a, BG) < 64 * 64, "fan rendered nothing");
    assert_eq!(a.pixels(), b.pixels());
}

#[test]
fn mesh_material_override_controls_the_object_color() {
    const L: usize = 32;
    let verts = [
        Vec3::new(-0.5, -0.5, -2.0),
        Vec3::new(0.5, -0.5, -2.0),
        Vec3::new(0.0, 0.5, -2.0),
    ];
    let faces = [1_u16, 0, 1, 2, 0];
    let mesh = Mesh3 {
        material: Material {
            color: Rgb::new(0.0, 1.0, 0.0),
            ambient_strength: 1.0,
            diffuse_strength: 0.0,
            specular_strength: 0.0,
            specular_exponent: 0,
        },
        ..Mesh3::untextured(&verts, &faces)
    };

    let render = |use_mesh_material: bool| -> Image<Rgba8888> {
        let mut fb = Image::<Rgba8888>::new(L, L);
        {
            let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
            r.set_target(&mut fb);
            r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
            ambient_only(&mut r);
            r.set_material_color(Rgb::new(1.0, 0.0, 0.0));
            r.draw_mesh(Shader::FLAT, &mesh, use_mesh_material, true)
                .unwrap();
        }
        fb
    };

    let with_override = render(true);
    assert!(count(&with_override, 0xff00_ff00) > 0);
    assert_eq!(count(&with_override, RED), 0);

    let without = render(false);
    assert!(count(&without, RED) > 0);
    assert_eq!(count(&without, 0xff00_ff00), 0);
}

#[test]
fn out_of_frame_mesh_draws_nothing() {
    const L: usize = 32;
    let verts = [
        Vec3::new(-100.0, -0.5, -2.0),
        Vec3::new(-99.0, -0.5, -2.0),
        Vec3::new(-99.5, 0.5, -2.0),
    ];
    let faces = [1_u16, 0, 1, 2, 0];
    let mesh = Mesh3 {
        bounds: BoundingBox {
            xmin: -100.0,
            xmax: -99.0,
            ymin: -0.5,
            ymax: 0.5,
            zmin: -2.0,
            zmax: -2.0,
        },
        ..Mesh3::untextured(&verts, &faces)
    };

    let mut fb = Image::<Rgba8888>::new(L, L);
    {
        let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
        r.set_target(&mut fb);
        r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
        ambient_only(&mut r);
        r.draw_mesh(Shader::FLAT, &mesh, false, true).unwrap();
    }
    assert_eq!(count(&fb, BG), L * L);
}

#[test]
fn tiled_rendering_matches_full_frame() {
    const L: usize = 32;
    const T: usize = 16;
    let (verts, normals) = fan_vertices();
    #[rustfmt::skip]
    let faces: Vec<u16> = vec![
        4,
        0, 0,  1, 1,  2, 2,
        3, 3,
        4, 4,
        5, 5,
        0,
    ];
    let mesh = Mesh3 {
        vertices: &verts,
        normals: Some(&normals),
        texcoords: None,
        texture: None,
        faces: &faces,
        bounds: BoundingBox {
            xmin: -0.8,
            xmax: 0.8,
            ymin: -0.8,
            ymax: 0.8,
            zmin: -2.0,
            zmax: -2.0,
        },
        material: Material::default(),
        next: None,
    };

    let draw = |target: &mut Image<Rgba8888>, ox: i32, oy: i32| {
        let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
        r.set_target(target);
        r.set_offset(ox, oy);
        r.set_ortho(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
        r.set_culling(0);
        r.draw_mesh(Shader::GOURAUD, &mesh, false, false).unwrap();
    };

    let mut full = Image::<Rgba8888>::new(L, L);
    draw(&mut full, 0, 0);

    let mut assembled = Image::<Rgba8888>::new(L, L);
    for (tx, ty) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let mut tile = Image::<Rgba8888>::new(T, T);
        draw(&mut tile, (tx * T) as i32, (ty * T) as i32);
        for y in 0..T {
            for x in 0..T {
                assembled.set(tx * T + x, ty * T + y, tile.get(x, y));
            }
        }
    }

    assert!(count(&full, BG) < L * L, "fan rendered nothing");
    assert_eq!(full.pixels(), assembled.pixels());
}

#[test]
fn lower_left_half_scenario() {
    const L: usize = 16;
    let ccw = [
        Vec3::new(-1.0, -1.0, -0.5),
        Vec3::new(1.0, -1.0, -0.5),
        Vec3::new(-1.0, 1.0, -0.5),
    ];

    let render = |tri: [Vec3; 3], culling: i32| -> Image<Rgba8888> {
        let mut fb = Image::<Rgba8888>::new(L, L);
        {
            let mut r = Renderer::<Rgba8888, L, L, false, true>::new();
            r.set_target(&mut fb);
            r.set_ortho(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
            r.set_culling(culling);
            ambient_only(&mut r);
            r.set_material_color(Rgb::new(1.0, 0.0, 0.0));
            r.draw_triangle(Shader::FLAT, tri, None, None, None).unwrap();
        }
        fb
    };

    let fb = render(ccw, 0);
    // The hypotenuse runs down the main diagonal; its pixel centers sit
    // exactly on the edge, which the fill rule leaves out. That leaves the
    // 120 pixels strictly below the diagonal.
    assert_eq!(count(&fb, RED), (L * L - L) / 2);
    for y in 0..L {
        for x in 0..L {
            let expect = y > x;
            assert_eq!(
                fb.get(x, y).0 == RED,
                expect,
                "pixel ({x},{y}) disagrees with the diagonal rule"
            );
        }
    }

    // Clockwise winding with clockwise culling leaves the image untouched.
    let cw = [ccw[0], ccw[2], ccw[1]];
    let fb = render(cw, 1);
    assert_eq!(count(&fb, BG), L * L);
}
