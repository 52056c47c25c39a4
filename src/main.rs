//! Canyonrun - Main Entry Point
//!
//! A drivable vehicle demo: a five-body rig on procedurally sampled
//! canyon terrain, with a damped chase camera.

use std::collections::HashSet;

use canyonrun_game::{DriverInput, Simulation, SimulationConfig};
use canyonrun_physics::{BodyPose, TerrainMesh};
use canyonrun_renderer::{CameraConfig, ChaseCamera};
use three_d::*;

/// Input state tracking
struct InputState {
    forward: bool,
    reverse: bool,
    brake: bool,
    respawn: bool,
    keys_pressed: HashSet<Key>,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            forward: false,
            reverse: false,
            brake: false,
            respawn: false,
            keys_pressed: HashSet::new(),
        }
    }
}

impl InputState {
    fn to_driver_input(&self) -> DriverInput {
        DriverInput {
            forward: self.forward,
            reverse: self.reverse,
            brake: self.brake,
            respawn: self.respawn,
        }
    }

    fn handle_key(&mut self, key: Key, pressed: bool) {
        if pressed {
            self.keys_pressed.insert(key);
        } else {
            self.keys_pressed.remove(&key);
        }

        match key {
            Key::W | Key::ArrowUp => self.forward = pressed,
            Key::S | Key::ArrowDown => self.reverse = pressed,
            Key::Space => self.brake = pressed,
            Key::R => self.respawn = pressed,
            _ => {}
        }
    }
}

/// Analytic canyon elevation: gentle rolling along the run, steep walls
/// rising away from the lane.
fn canyon_height(x: f32, z: f32) -> f32 {
    let rolling = 3.0 * (0.02 * z).sin() + 1.5 * (0.07 * z + 1.3).sin();
    let wall = (((x.abs() - 10.0).max(0.0) / 50.0).powi(2) * 80.0).min(140.0);
    rolling + wall
}

/// Sample the canyon into a triangle grid. The same vertices and indices
/// feed both the visual mesh and the physics ray-cast surface.
fn canyon_grid() -> (Vec<glam::Vec3>, Vec<[u32; 3]>) {
    const STEP: f32 = 5.0;
    const HALF_X: i32 = 40; // +/- 200 world units
    const HALF_Z: i32 = 164; // +/- 820 world units

    let cols = (2 * HALF_X + 1) as u32;
    let mut positions = Vec::new();
    for zi in -HALF_Z..=HALF_Z {
        for xi in -HALF_X..=HALF_X {
            let x = xi as f32 * STEP;
            let z = zi as f32 * STEP;
            positions.push(glam::Vec3::new(x, canyon_height(x, z), z));
        }
    }

    let mut indices = Vec::new();
    for zi in 0..(2 * HALF_Z) as u32 {
        for xi in 0..(2 * HALF_X) as u32 {
            let a = zi * cols + xi;
            let b = a + 1;
            let c = a + cols;
            let d = c + 1;
            // Wound so face normals point up.
            indices.push([a, c, d]);
            indices.push([a, d, b]);
        }
    }
    (positions, indices)
}

fn terrain_cpu_mesh(positions: &[glam::Vec3], indices: &[[u32; 3]]) -> CpuMesh {
    let mut mesh = CpuMesh {
        positions: Positions::F32(positions.iter().map(|p| vec3(p.x, p.y, p.z)).collect()),
        indices: Indices::U32(indices.iter().flatten().copied().collect()),
        ..Default::default()
    };
    mesh.compute_normals();
    mesh
}

/// Body pose to a three-d model transform.
fn pose_transform(pose: &BodyPose) -> Mat4 {
    let q = pose.rotation;
    let p = pose.position;
    Mat4::from_translation(vec3(p.x, p.y, p.z)) * Mat4::from(Quat::new(q.w, q.x, q.y, q.z))
}

fn opaque(context: &Context, r: u8, g: u8, b: u8, roughness: f32) -> PhysicalMaterial {
    PhysicalMaterial::new_opaque(
        context,
        &CpuMaterial {
            albedo: Srgba::new(r, g, b, 255),
            roughness,
            metallic: 0.0,
            ..Default::default()
        },
    )
}

fn main() {
    env_logger::init();

    let window = Window::new(WindowSettings {
        title: "Canyonrun".to_string(),
        max_size: Some((1920, 1080)),
        ..Default::default()
    })
    .unwrap();

    let context = window.gl();

    // Simulation and terrain. A failed terrain build leaves the world
    // without ground; the demo still runs, it just has nothing to drive on.
    let mut simulation = Simulation::new(SimulationConfig::default());
    let (positions, indices) = canyon_grid();
    let terrain_visual = terrain_cpu_mesh(&positions, &indices);
    match TerrainMesh::new(&positions, &indices) {
        Ok(mesh) => simulation.attach_terrain(mesh),
        Err(e) => log::warn!("terrain surface unavailable: {e}"),
    }

    let mut input_state = InputState::default();

    let mut chase_camera = ChaseCamera::new(CameraConfig::default());
    chase_camera.snap_to(simulation.chassis_position(), glam::Quat::IDENTITY);

    // Terrain
    let terrain = Gm::new(
        Mesh::new(&context, &terrain_visual),
        opaque(&context, 118, 104, 74, 0.95),
    );

    // Vehicle: the chassis renders as its three collision spheres, the
    // wheels as spheres at their physics radii.
    let sphere = CpuMesh::sphere(16);
    let chassis_offsets = [
        (vec3(0.0, 0.3, 0.2), 0.5f32),
        (vec3(0.0, 0.1, 1.2), 0.25),
        (vec3(0.0, 0.1, -1.2), 0.25),
    ];
    let mut chassis_parts: Vec<Gm<Mesh, PhysicalMaterial>> = chassis_offsets
        .iter()
        .map(|_| Gm::new(Mesh::new(&context, &sphere), opaque(&context, 178, 34, 34, 0.5)))
        .collect();
    let wheel_radii = [0.35f32, 0.35, 0.4, 0.4];
    let mut wheel_parts: Vec<Gm<Mesh, PhysicalMaterial>> = wheel_radii
        .iter()
        .map(|_| Gm::new(Mesh::new(&context, &sphere), opaque(&context, 30, 30, 34, 0.8)))
        .collect();

    // Dynamic props
    let mut rocks: Vec<Gm<Mesh, PhysicalMaterial>> = (0..simulation.sphere_poses().len())
        .map(|_| Gm::new(Mesh::new(&context, &sphere), opaque(&context, 128, 128, 128, 0.9)))
        .collect();
    let cylinder = CpuMesh::cylinder(16);
    let mut logs: Vec<Gm<Mesh, PhysicalMaterial>> = (0..simulation.log_poses().len())
        .map(|_| Gm::new(Mesh::new(&context, &cylinder), opaque(&context, 110, 74, 40, 0.9)))
        .collect();

    // Trees: one instanced cone per variant, placed once.
    let cone = CpuMesh::cone(8);
    let tree_colors = [(34u8, 110u8, 42u8), (46, 130, 50), (26, 92, 38)];
    let mut tree_variants: Vec<Gm<InstancedMesh, PhysicalMaterial>> = Vec::new();
    for (variant, &(r, g, b)) in tree_colors.iter().enumerate() {
        let transformations: Vec<Mat4> = simulation
            .trees()
            .iter()
            .filter(|t| t.variant == variant)
            .map(|t| {
                let p = t.position;
                Mat4::from_translation(vec3(p.x, p.y, p.z))
                    * Mat4::from_angle_z(degrees(90.0))
                    * Mat4::from_nonuniform_scale(t.scale, t.scale * 0.35, t.scale * 0.35)
            })
            .collect();
        tree_variants.push(Gm::new(
            InstancedMesh::new(
                &context,
                &Instances {
                    transformations,
                    ..Default::default()
                },
                &cone,
            ),
            opaque(&context, r, g, b, 1.0),
        ));
    }

    let ambient = AmbientLight::new(&context, 0.4, Srgba::WHITE);
    let mut sun = DirectionalLight::new(&context, 1.2, Srgba::WHITE, vec3(-1.0, -1.0, -1.0));

    window.render_loop(move |mut frame_input| {
        for event in frame_input.events.iter() {
            match event {
                Event::KeyPress { kind, handled, .. } if !*handled => {
                    input_state.handle_key(*kind, true);

                    if *kind == Key::Q {
                        return FrameOutput {
                            exit: true,
                            ..Default::default()
                        };
                    }
                }
                Event::KeyRelease { kind, handled, .. } if !*handled => {
                    input_state.handle_key(*kind, false);
                }
                _ => {}
            }
        }

        let dt = (frame_input.elapsed_time / 1000.0) as f32;
        simulation.tick(input_state.to_driver_input(), dt);

        if simulation.frame() % 300 == 0 {
            let p = simulation.chassis_position();
            log::debug!(
                "frame {}: chassis ({:.1}, {:.1}, {:.1}), drive {:.1}",
                simulation.frame(),
                p.x,
                p.y,
                p.z,
                simulation.forward_velocity()
            );
        }

        // Sync visuals to physics poses.
        let poses = simulation.rig_poses();
        let chassis_mat = pose_transform(&poses.chassis);
        for (part, (offset, radius)) in chassis_parts.iter_mut().zip(chassis_offsets) {
            part.set_transformation(
                chassis_mat * Mat4::from_translation(offset) * Mat4::from_scale(radius),
            );
        }
        for ((part, pose), radius) in wheel_parts.iter_mut().zip(poses.wheels).zip(wheel_radii) {
            part.set_transformation(pose_transform(&pose) * Mat4::from_scale(radius));
        }
        for (rock, pose) in rocks.iter_mut().zip(simulation.sphere_poses()) {
            rock.set_transformation(pose_transform(&pose) * Mat4::from_scale(0.9));
        }
        for (log_gm, pose) in logs.iter_mut().zip(simulation.log_poses()) {
            // The unit cylinder spans x 0..1; center it and stretch to the
            // collider's half-length 2.0 and radius 0.25.
            log_gm.set_transformation(
                pose_transform(&pose)
                    * Mat4::from_translation(vec3(-2.0, 0.0, 0.0))
                    * Mat4::from_nonuniform_scale(4.0, 0.25, 0.25),
            );
        }

        // Camera and sun follow the chassis.
        let chassis_pos = simulation.chassis_position();
        let pose = chase_camera.update(chassis_pos, poses.chassis.rotation, dt);
        let light = chase_camera.light_pose(chassis_pos);
        let dir = light.target - light.position;
        sun.direction = vec3(dir.x, dir.y, dir.z);

        let camera = Camera::new_perspective(
            frame_input.viewport,
            vec3(pose.position.x, pose.position.y, pose.position.z),
            vec3(pose.target.x, pose.target.y, pose.target.z),
            vec3(0.0, 1.0, 0.0),
            degrees(60.0),
            0.1,
            2000.0,
        );

        let mut objects: Vec<&dyn Object> = vec![&terrain];
        objects.extend(chassis_parts.iter().map(|g| g as &dyn Object));
        objects.extend(wheel_parts.iter().map(|g| g as &dyn Object));
        objects.extend(rocks.iter().map(|g| g as &dyn Object));
        objects.extend(logs.iter().map(|g| g as &dyn Object));
        objects.extend(tree_variants.iter().map(|g| g as &dyn Object));

        frame_input
            .screen()
            .clear(ClearState::color_and_depth(0.55, 0.7, 0.9, 1.0, 1.0))
            .render(&camera, &objects, &[&ambient, &sun]);

        FrameOutput::default()
    });
}
