//! Marble physics using `Rapier2D`.
//!
//! One dynamic marble rolls against fixed wall chains, obstacle bodies and
//! kinematic platforms. Bodies are addressed by [`BodyId`], stored in each rapier
//! body's `user_data` so collider handles map back without name lookups.

use std::fmt;

use parking_lot::Mutex;
use rapier2d::prelude::CollisionEvent as RapierCollisionEvent;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::PhysicsTuning;
use crate::error::PhysicsError;
use crate::level::{Level, ObstacleKind};

/// Nominal frame time (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Typed handle to a body owned by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyId {
    Marble,
    /// Index into `Level::walls`.
    Wall(usize),
    /// Index into `Level::obstacles`.
    Obstacle(usize),
}

const USER_DATA_MARBLE: u64 = 1;
const USER_DATA_WALL: u64 = 2;
const USER_DATA_OBSTACLE: u64 = 3;

impl BodyId {
    /// Encodes the id into rapier `user_data` (type tag in the high 64 bits).
    pub fn to_user_data(self) -> u128 {
        let (tag, index) = match self {
            Self::Marble => (USER_DATA_MARBLE, 0),
            Self::Wall(i) => (USER_DATA_WALL, i as u64),
            Self::Obstacle(i) => (USER_DATA_OBSTACLE, i as u64),
        };
        (u128::from(tag) << 64) | u128::from(index)
    }

    /// Decodes rapier `user_data`. Returns `None` for untagged bodies.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_user_data(user_data: u128) -> Option<Self> {
        let tag = (user_data >> 64) as u64;
        let index = usize::try_from(user_data as u64).ok()?;
        match tag {
            USER_DATA_MARBLE => Some(Self::Marble),
            USER_DATA_WALL => Some(Self::Wall(index)),
            USER_DATA_OBSTACLE => Some(Self::Obstacle(index)),
            _ => None,
        }
    }
}

/// Contact between two bodies during the last step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionEvent {
    Started(BodyId, BodyId),
    Stopped(BodyId, BodyId),
}

impl CollisionEvent {
    /// Both bodies of the contact.
    pub fn bodies(&self) -> (BodyId, BodyId) {
        match *self {
            Self::Started(a, b) | Self::Stopped(a, b) => (a, b),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(..))
    }

    /// The body on the other side of `body`, if `body` takes part in the contact.
    pub fn other(&self, body: BodyId) -> Option<BodyId> {
        let (a, b) = self.bodies();
        if a == body {
            Some(b)
        } else if b == body {
            Some(a)
        } else {
            None
        }
    }
}

/// Collects rapier collision events raised during `PhysicsPipeline::step`.
#[derive(Default)]
struct EventCollector {
    events: Mutex<Vec<RapierCollisionEvent>>,
}

impl EventCollector {
    fn into_events(self) -> Vec<RapierCollisionEvent> {
        self.events.into_inner()
    }
}

impl EventHandler for EventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: RapierCollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.events.lock().push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

#[derive(Debug, Clone, Copy)]
struct ObstacleBody {
    kind: ObstacleKind,
    handle: RigidBodyHandle,
    base: [f32; 2],
}

/// Vertical offset of a moving platform after `time` seconds: a linear rise of
/// `amplitude` over `half_period`, then the mirror-image fall.
pub fn platform_offset(time: f32, amplitude: f32, half_period: f32) -> f32 {
    if half_period <= 0.0 {
        return 0.0;
    }
    let phase = time.rem_euclid(2.0 * half_period);
    if phase <= half_period {
        amplitude * phase / half_period
    } else {
        amplitude * (2.0 * half_period - phase) / half_period
    }
}

/// Physics world for one level: the marble plus the level's static geometry.
pub struct PhysicsWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    tuning: PhysicsTuning,
    marble: RigidBodyHandle,
    walls: Vec<RigidBodyHandle>,
    obstacles: Vec<ObstacleBody>,
    events: Vec<CollisionEvent>,
    elapsed: f32,
    frame: u64,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("elapsed", &self.elapsed)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Builds the world for `level`: marble at the start position, one fixed body
    /// per wall polyline and one body per obstacle.
    pub fn from_level(level: &Level, tuning: PhysicsTuning) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: tuning.max_substep,
            ..Default::default()
        };

        let mut world = Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, 0.0),
            tuning,
            marble: RigidBodyHandle::invalid(),
            walls: Vec::with_capacity(level.walls.len()),
            obstacles: Vec::with_capacity(level.obstacles.len()),
            events: Vec::new(),
            elapsed: 0.0,
            frame: 0,
        };

        world.marble = world.spawn_marble(level.start_position);
        for (index, wall) in level.walls.iter().enumerate() {
            let handle = world.spawn_wall(index, wall);
            world.walls.push(handle);
        }
        for (index, obstacle) in level.obstacles.iter().enumerate() {
            let handle = world.spawn_obstacle(index, obstacle.kind, obstacle.position, obstacle.rotation);
            world.obstacles.push(ObstacleBody {
                kind: obstacle.kind,
                handle,
                base: obstacle.position,
            });
        }

        tracing::debug!(
            "[physics] Built world for level {}: {} bodies, {} colliders",
            level.id,
            world.rigid_body_set.len(),
            world.collider_set.len()
        );
        world
    }

    fn spawn_marble(&mut self, position: [f32; 2]) -> RigidBodyHandle {
        let t = &self.tuning;
        let body = RigidBodyBuilder::dynamic()
            .translation(Vector::new(position[0], position[1]))
            .linear_damping(t.marble_linear_damping)
            .angular_damping(t.marble_angular_damping)
            .ccd_enabled(true)
            .user_data(BodyId::Marble.to_user_data())
            .build();
        let collider = ColliderBuilder::ball(t.marble_radius)
            .restitution(t.marble_material.restitution)
            .friction(t.marble_material.friction)
            .mass(t.marble_mass)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// One fixed body per polyline, one thin cuboid per segment. Segments are
    /// lengthened by the half thickness so consecutive segments close their corner.
    fn spawn_wall(&mut self, index: usize, points: &[[f32; 2]]) -> RigidBodyHandle {
        let t = self.tuning;
        let body = RigidBodyBuilder::fixed()
            .lock_rotations()
            .user_data(BodyId::Wall(index).to_user_data())
            .build();
        let handle = self.rigid_body_set.insert(body);

        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let dx = end[0] - start[0];
            let dy = end[1] - start[1];
            let length = (dx * dx + dy * dy).sqrt();
            if length < f32::EPSILON {
                continue;
            }
            let mid = [f32::midpoint(start[0], end[0]), f32::midpoint(start[1], end[1])];

            let collider = ColliderBuilder::cuboid(length / 2.0 + t.wall_half_thickness, t.wall_half_thickness)
                .translation(Vector::new(mid[0], mid[1]))
                .rotation(dy.atan2(dx))
                .restitution(t.wall_material.restitution)
                .friction(t.wall_material.friction)
                .build();
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        }

        handle
    }

    fn spawn_obstacle(
        &mut self,
        index: usize,
        kind: ObstacleKind,
        position: [f32; 2],
        rotation: f32,
    ) -> RigidBodyHandle {
        let t = self.tuning;
        let builder = match kind {
            ObstacleKind::Hole | ObstacleKind::Bumper => RigidBodyBuilder::fixed(),
            ObstacleKind::MovingPlatform => RigidBodyBuilder::kinematic_position_based(),
        };
        let body = builder
            .translation(Vector::new(position[0], position[1]))
            .rotation(rotation)
            .lock_rotations()
            .user_data(BodyId::Obstacle(index).to_user_data())
            .build();

        let collider = match kind {
            ObstacleKind::Hole => ColliderBuilder::ball(t.hole_radius).sensor(true).build(),
            ObstacleKind::Bumper => ColliderBuilder::ball(t.bumper_radius)
                .restitution(t.bumper_restitution)
                .friction(t.wall_material.friction)
                .build(),
            ObstacleKind::MovingPlatform => {
                ColliderBuilder::cuboid(t.platform_size[0] / 2.0, t.platform_size[1] / 2.0)
                    .restitution(t.wall_material.restitution)
                    .friction(t.wall_material.friction)
                    .build()
            }
        };

        let handle = self.rigid_body_set.insert(body);
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Advances the simulation by `dt` seconds with gravity equal to
    /// `applied_force` times the gravity multiplier.
    ///
    /// `dt` is split into equal sub-steps no longer than `max_substep`. Marble
    /// velocities are clamped after every sub-step.
    pub fn step(&mut self, dt: f32, applied_force: Vector) -> Result<(), PhysicsError> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidTimestep(dt));
        }
        self.marble_body()?;

        self.events.clear();
        if dt == 0.0 {
            return Ok(());
        }

        self.gravity = applied_force * self.tuning.gravity_multiplier;

        let substeps = self.substep_count(dt);
        #[allow(clippy::cast_precision_loss)]
        let sub_dt = dt / substeps as f32;
        self.integration_parameters.dt = sub_dt;

        let collector = EventCollector::default();
        for _ in 0..substeps {
            self.elapsed += sub_dt;
            self.drive_platforms()?;

            self.physics_pipeline.step(
                self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.rigid_body_set,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                &mut self.ccd_solver,
                &(),
                &collector,
            );

            self.clamp_marble()?;
            self.frame += 1;
        }

        let raw = collector.into_events();
        self.events = raw
            .into_iter()
            .filter_map(|event| self.convert_event(event))
            .collect();

        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn substep_count(&self, dt: f32) -> u32 {
        let max_substep = self.tuning.max_substep.max(f32::EPSILON);
        let wanted = (dt / max_substep).ceil().max(1.0);
        (wanted as u32).clamp(1, self.tuning.max_substeps.max(1))
    }

    fn drive_platforms(&mut self) -> Result<(), PhysicsError> {
        let offset = platform_offset(
            self.elapsed,
            self.tuning.platform_amplitude,
            self.tuning.platform_half_period,
        );
        for (index, obstacle) in self.obstacles.iter().enumerate() {
            if obstacle.kind != ObstacleKind::MovingPlatform {
                continue;
            }
            let body = self
                .rigid_body_set
                .get_mut(obstacle.handle)
                .ok_or(PhysicsError::MissingBody(BodyId::Obstacle(index)))?;
            body.set_next_kinematic_translation(Vector::new(
                obstacle.base[0],
                obstacle.base[1] + offset,
            ));
        }
        Ok(())
    }

    /// Sign-preserving clamp of the marble's linear (per axis) and angular speed.
    fn clamp_marble(&mut self) -> Result<(), PhysicsError> {
        let max_linear = self.tuning.max_linear_speed;
        let max_angular = self.tuning.max_angular_speed;
        let body = self.marble_body_mut()?;
        if !body.is_dynamic() {
            return Ok(());
        }

        let linvel = body.linvel();
        let (vx, vy) = (linvel.x, linvel.y);
        let clamped_x = vx.clamp(-max_linear, max_linear);
        let clamped_y = vy.clamp(-max_linear, max_linear);
        if clamped_x != vx || clamped_y != vy {
            body.set_linvel(Vector::new(clamped_x, clamped_y), true);
        }

        let angvel = body.angvel();
        let clamped = angvel.clamp(-max_angular, max_angular);
        if clamped != angvel {
            body.set_angvel(clamped, true);
        }
        Ok(())
    }

    fn body_id_of(&self, collider: ColliderHandle) -> Option<BodyId> {
        let parent = self.collider_set.get(collider)?.parent()?;
        BodyId::from_user_data(self.rigid_body_set.get(parent)?.user_data)
    }

    fn convert_event(&self, event: RapierCollisionEvent) -> Option<CollisionEvent> {
        match event {
            RapierCollisionEvent::Started(h1, h2, _flags) => {
                Some(CollisionEvent::Started(self.body_id_of(h1)?, self.body_id_of(h2)?))
            }
            RapierCollisionEvent::Stopped(h1, h2, _flags) => {
                Some(CollisionEvent::Stopped(self.body_id_of(h1)?, self.body_id_of(h2)?))
            }
        }
    }

    /// Collision events raised by the last `step`.
    pub fn collision_events(&self) -> impl Iterator<Item = &CollisionEvent> + '_ {
        self.events.iter()
    }

    /// Stops the marble from responding to forces and collisions. It keeps its
    /// current position.
    pub fn freeze_marble(&mut self) -> Result<(), PhysicsError> {
        let body = self.marble_body_mut()?;
        body.set_linvel(Vector::new(0.0, 0.0), false);
        body.set_angvel(0.0, false);
        body.set_body_type(RigidBodyType::Fixed, true);
        Ok(())
    }

    /// Teleports the marble, zeroes its velocities and makes it dynamic again.
    pub fn reset_marble(&mut self, position: Vector) -> Result<(), PhysicsError> {
        let body = self.marble_body_mut()?;
        body.set_body_type(RigidBodyType::Dynamic, true);
        body.set_translation(position, true);
        body.set_linvel(Vector::new(0.0, 0.0), true);
        body.set_angvel(0.0, true);
        Ok(())
    }

    fn marble_body(&self) -> Result<&RigidBody, PhysicsError> {
        self.rigid_body_set
            .get(self.marble)
            .ok_or(PhysicsError::MissingBody(BodyId::Marble))
    }

    fn marble_body_mut(&mut self) -> Result<&mut RigidBody, PhysicsError> {
        self.rigid_body_set
            .get_mut(self.marble)
            .ok_or(PhysicsError::MissingBody(BodyId::Marble))
    }

    pub fn marble_position(&self) -> Result<Vector, PhysicsError> {
        let pos = self.marble_body()?.translation();
        Ok(Vector::new(pos.x, pos.y))
    }

    pub fn marble_velocity(&self) -> Result<Vector, PhysicsError> {
        let vel = self.marble_body()?.linvel();
        Ok(Vector::new(vel.x, vel.y))
    }

    pub fn marble_angular_velocity(&self) -> Result<f32, PhysicsError> {
        Ok(self.marble_body()?.angvel())
    }

    /// Marble rotation angle in radians.
    pub fn marble_rotation(&self) -> Result<f32, PhysicsError> {
        Ok(self.marble_body()?.rotation().angle())
    }

    pub fn is_marble_dynamic(&self) -> Result<bool, PhysicsError> {
        Ok(self.marble_body()?.is_dynamic())
    }

    /// Current position of obstacle `index`.
    pub fn obstacle_position(&self, index: usize) -> Result<Vector, PhysicsError> {
        let missing = PhysicsError::MissingBody(BodyId::Obstacle(index));
        let obstacle = self.obstacles.get(index).ok_or(missing)?;
        let pos = self.rigid_body_set.get(obstacle.handle).ok_or(missing)?.translation();
        Ok(Vector::new(pos.x, pos.y))
    }

    /// Number of obstacle bodies.
    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    /// Number of wall bodies.
    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    /// Gravity used by the last step.
    pub fn gravity(&self) -> Vector {
        self.gravity
    }

    /// Simulation time accumulated by `step`.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Number of integration sub-steps run so far.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Obstacle;
    use crate::test_utils::straight_wall_level;

    fn world_for(level: &Level) -> PhysicsWorld {
        PhysicsWorld::from_level(level, PhysicsTuning::default())
    }

    #[test]
    fn test_world_creation() {
        let level = straight_wall_level();
        let world = world_for(&level);

        assert_eq!(world.wall_count(), 1);
        assert_eq!(world.obstacle_count(), 0);
        assert_eq!(world.current_frame(), 0);
        assert_eq!(world.marble_position().unwrap(), Vector::new(0.0, 50.0));
        assert!(world.is_marble_dynamic().unwrap());
    }

    #[test]
    fn test_user_data_roundtrip() {
        for id in [BodyId::Marble, BodyId::Wall(3), BodyId::Obstacle(12)] {
            assert_eq!(BodyId::from_user_data(id.to_user_data()), Some(id));
        }
        assert_eq!(BodyId::from_user_data(0), None);
    }

    #[test]
    fn test_invalid_timestep() {
        let mut world = world_for(&straight_wall_level());
        let force = Vector::new(0.0, 0.0);

        for dt in [-0.016, f32::NAN, f32::INFINITY] {
            assert!(matches!(world.step(dt, force), Err(PhysicsError::InvalidTimestep(_))));
        }
        assert_eq!(world.current_frame(), 0);

        // Zero is a valid (empty) step
        assert!(world.step(0.0, force).is_ok());
        assert_eq!(world.current_frame(), 0);
    }

    #[test]
    fn test_large_dt_is_substepped() {
        let mut world = world_for(&straight_wall_level());
        world.step(0.04, Vector::new(0.0, 0.0)).unwrap();
        // 0.04s needs three sub-steps of at most 1/60
        assert_eq!(world.current_frame(), 3);
        assert!((world.elapsed() - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_gravity_is_doubled_force() {
        let mut world = world_for(&straight_wall_level());
        world.step(PHYSICS_DT, Vector::new(5.0, -3.0)).unwrap();
        assert_eq!(world.gravity(), Vector::new(10.0, -6.0));
    }

    #[test]
    fn test_rolls_along_wall_without_crossing() {
        let level = straight_wall_level();
        let mut world = world_for(&level);
        let force = Vector::new(5.0, 0.0);

        let mut last_x = world.marble_position().unwrap().x;
        for _ in 0..600 {
            world.step(PHYSICS_DT, force).unwrap();
            let pos = world.marble_position().unwrap();
            assert!(pos.y > 0.0, "marble crossed the wall line: {pos:?}");
            assert!(pos.x >= last_x, "marble moved backwards");
            last_x = pos.x;
        }
        assert!(last_x > 100.0, "marble only reached x={last_x}");
    }

    #[test]
    fn test_marble_rests_on_wall() {
        let mut level = straight_wall_level();
        level.walls = vec![vec![[-100.0, 0.0], [100.0, 0.0]]];
        let mut world = world_for(&level);

        // Strongest possible downward tilt
        let force = Vector::new(0.0, -12.0 * 9.81);
        for _ in 0..300 {
            world.step(PHYSICS_DT, force).unwrap();
            let pos = world.marble_position().unwrap();
            assert!(pos.y > 0.0, "marble tunneled through the wall: {pos:?}");
        }

        let pos = world.marble_position().unwrap();
        assert!(pos.y > 9.0 && pos.y < 14.0, "marble should rest on the wall, y={}", pos.y);
    }

    #[test]
    fn test_velocity_clamp_preserves_sign() {
        let mut world = world_for(&straight_wall_level());
        {
            let body = world.rigid_body_set.get_mut(world.marble).unwrap();
            // Away from the wall so nothing but the clamp changes the velocity
            body.set_linvel(Vector::new(5000.0, 3000.0), true);
            body.set_angvel(-100.0, true);
        }

        world.step(PHYSICS_DT, Vector::new(0.0, 0.0)).unwrap();

        let vel = world.marble_velocity().unwrap();
        assert!(vel.x <= 1000.0 && vel.x > 900.0, "vx={}", vel.x);
        assert!(vel.y <= 1000.0 && vel.y > 900.0, "vy={}", vel.y);
        let angvel = world.marble_angular_velocity().unwrap();
        assert!(angvel >= -20.0 && angvel < 0.0, "angvel={angvel}");
    }

    #[test]
    fn test_speed_bounds_hold_over_time() {
        let mut level = straight_wall_level();
        level.walls.push(vec![[-300.0, -300.0], [300.0, -300.0], [300.0, 300.0]]);
        let mut world = world_for(&level);

        let forces = [
            Vector::new(117.72, -117.72),
            Vector::new(-117.72, 0.0),
            Vector::new(0.0, 117.72),
            Vector::new(60.0, -90.0),
        ];
        for i in 0..400 {
            world.step(PHYSICS_DT, forces[(i / 50) % forces.len()]).unwrap();
            let vel = world.marble_velocity().unwrap();
            assert!(vel.x.abs() <= 1000.0 && vel.y.abs() <= 1000.0);
            assert!(world.marble_angular_velocity().unwrap().abs() <= 20.0);
        }
    }

    #[test]
    fn test_freeze_and_reset() {
        let mut world = world_for(&straight_wall_level());
        world.step(PHYSICS_DT, Vector::new(50.0, 0.0)).unwrap();

        world.freeze_marble().unwrap();
        let frozen_at = world.marble_position().unwrap();
        for _ in 0..30 {
            world.step(PHYSICS_DT, Vector::new(100.0, -100.0)).unwrap();
        }
        assert!(!world.is_marble_dynamic().unwrap());
        assert_eq!(world.marble_position().unwrap(), frozen_at);

        world.reset_marble(Vector::new(-20.0, 80.0)).unwrap();
        assert!(world.is_marble_dynamic().unwrap());
        assert_eq!(world.marble_position().unwrap(), Vector::new(-20.0, 80.0));
        assert_eq!(world.marble_velocity().unwrap(), Vector::new(0.0, 0.0));
        assert_eq!(world.marble_angular_velocity().unwrap(), 0.0);
    }

    #[test]
    fn test_platform_offset() {
        assert_eq!(platform_offset(0.0, 50.0, 1.0), 0.0);
        assert!((platform_offset(0.5, 50.0, 1.0) - 25.0).abs() < 1e-4);
        assert!((platform_offset(1.0, 50.0, 1.0) - 50.0).abs() < 1e-4);
        assert!((platform_offset(1.5, 50.0, 1.0) - 25.0).abs() < 1e-4);
        assert!(platform_offset(2.0, 50.0, 1.0).abs() < 1e-4);
        assert!((platform_offset(2.25, 50.0, 1.0) - 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_moving_platform_follows_simulation_time() {
        let mut level = straight_wall_level();
        level.obstacles.push(Obstacle {
            kind: ObstacleKind::MovingPlatform,
            position: [200.0, 100.0],
            rotation: 0.0,
        });

        // Same simulated time through different frame rates
        let mut coarse = world_for(&level);
        for _ in 0..15 {
            coarse.step(1.0 / 30.0, Vector::new(0.0, 0.0)).unwrap();
        }
        let mut fine = world_for(&level);
        for _ in 0..60 {
            fine.step(1.0 / 120.0, Vector::new(0.0, 0.0)).unwrap();
        }

        let a = coarse.obstacle_position(0).unwrap();
        let b = fine.obstacle_position(0).unwrap();
        assert!((a.y - 125.0).abs() < 0.01, "platform at {a:?}");
        assert!((a.y - b.y).abs() < 0.01);
        assert_eq!(a.x, 200.0);
    }

    #[test]
    fn test_hole_raises_collision_event() {
        let mut level = straight_wall_level();
        level.obstacles.push(Obstacle {
            kind: ObstacleKind::Hole,
            position: level.start_position,
            rotation: 0.0,
        });
        let mut world = world_for(&level);

        world.step(PHYSICS_DT, Vector::new(0.0, 0.0)).unwrap();

        let hit = world
            .collision_events()
            .any(|e| e.is_started() && e.other(BodyId::Marble) == Some(BodyId::Obstacle(0)));
        assert!(hit, "expected a marble/hole contact");

        // Sensors never push the marble
        assert_eq!(world.marble_velocity().unwrap(), Vector::new(0.0, 0.0));
    }

    #[test]
    fn test_missing_obstacle() {
        let world = world_for(&straight_wall_level());
        assert_eq!(
            world.obstacle_position(4),
            Err(PhysicsError::MissingBody(BodyId::Obstacle(4)))
        );
    }

    #[test]
    fn test_deterministic_simulation() {
        let level = straight_wall_level();
        let mut world1 = world_for(&level);
        let mut world2 = world_for(&level);

        for i in 0..120 {
            #[allow(clippy::cast_precision_loss)]
            let force = Vector::new((i as f32 * 0.1).sin() * 50.0, -30.0);
            world1.step(PHYSICS_DT, force).unwrap();
            world2.step(PHYSICS_DT, force).unwrap();
        }

        assert_eq!(world1.marble_position().unwrap(), world2.marble_position().unwrap());
        assert_eq!(world1.marble_velocity().unwrap(), world2.marble_velocity().unwrap());
        assert_eq!(
            world1.marble_angular_velocity().unwrap(),
            world2.marble_angular_velocity().unwrap()
        );
        assert_eq!(world1.marble_rotation().unwrap(), world2.marble_rotation().unwrap());
    }

    #[test]
    fn test_rolls_while_pressed_into_wall() {
        let mut level = straight_wall_level();
        level.walls = vec![vec![[-50.0, 0.0], [400.0, 0.0]]];
        let mut world = world_for(&level);

        // Sideways tilt plus a strong push into the floor
        let force = Vector::new(5.0, -40.0);
        for _ in 0..600 {
            world.step(PHYSICS_DT, force).unwrap();
            let pos = world.marble_position().unwrap();
            assert!(pos.y > 0.0, "marble crossed the wall line: {pos:?}");
        }

        let pos = world.marble_position().unwrap();
        assert!(pos.x > 30.0, "marble only reached x={}", pos.x);
        assert!(pos.y > 9.0 && pos.y < 14.0, "marble should stay on the wall, y={}", pos.y);
    }

    fn remove_body(world: &mut PhysicsWorld, handle: RigidBodyHandle) {
        world.rigid_body_set.remove(
            handle,
            &mut world.island_manager,
            &mut world.collider_set,
            &mut world.impulse_joint_set,
            &mut world.multibody_joint_set,
            true,
        );
    }

    #[test]
    fn test_missing_platform_body_fails_step() {
        let mut level = straight_wall_level();
        level.obstacles.push(Obstacle {
            kind: ObstacleKind::MovingPlatform,
            position: [200.0, 100.0],
            rotation: 0.0,
        });
        let mut world = world_for(&level);
        let handle = world.obstacles[0].handle;
        remove_body(&mut world, handle);

        assert_eq!(
            world.step(PHYSICS_DT, Vector::new(0.0, 0.0)),
            Err(PhysicsError::MissingBody(BodyId::Obstacle(0)))
        );
    }

    #[test]
    fn test_missing_marble_fails_step() {
        let mut world = world_for(&straight_wall_level());
        let handle = world.marble;
        remove_body(&mut world, handle);

        assert_eq!(
            world.step(PHYSICS_DT, Vector::new(0.0, 0.0)),
            Err(PhysicsError::MissingBody(BodyId::Marble))
        );
        assert_eq!(world.marble_position(), Err(PhysicsError::MissingBody(BodyId::Marble)));
    }
}
