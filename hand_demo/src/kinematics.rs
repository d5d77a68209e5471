//! Forward kinematics and projection for the software renderer.
//!
//! [`build_scene`] walks the hand from the wrist out to every fingertip and
//! emits world-space primitives.  [`Camera::project_scene`] turns those into
//! screen-space draw items, shaded and sorted back to front so the
//! visualizer can paint them in order.

use std::f32::consts::TAU;

use nalgebra::{Isometry3, Perspective3, Point3, Translation3, UnitQuaternion, Vector3};

use crate::hand::{BoxPart, CylinderPart, Finger, HandModel, JOINT_COLOR, JOINT_RADIUS};

const CYLINDER_SIDES: usize = 16;

// ════════════════════════════════════════════════════════════════════════════
// World-space primitives
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum Primitive {
    Sphere  { center: Point3<f32>, radius: f32, color: u32 },
    /// Tapered capsule from `a` (radius `ra`) to `b` (radius `rb`).
    Segment { a: Point3<f32>, b: Point3<f32>, ra: f32, rb: f32, color: u32 },
    /// Planar convex face with outward normal.
    Face    { points: Vec<Point3<f32>>, normal: Vector3<f32>, color: u32 },
}

impl Primitive {
    fn centroid(&self) -> Point3<f32> {
        match self {
            Primitive::Sphere { center, .. } => *center,
            Primitive::Segment { a, b, .. }  => nalgebra::center(a, b),
            Primitive::Face { points, .. } => {
                let sum = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords);
                Point3::from(sum / points.len().max(1) as f32)
            }
        }
    }
}

/// Hand space → world space: idle bob, then base pitch, then yaw.
pub fn hand_transform(hand: &HandModel) -> Isometry3<f32> {
    let (pitch, yaw) = hand.base_orientation();
    let idle = hand.idle();
    let rot = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw + idle.yaw);
    Isometry3::from_parts(Translation3::new(0.0, idle.bob, 0.0), rot)
}

/// World positions of a finger's joints and tip, root first.
pub fn finger_points(hand: &HandModel, finger: Finger, world: &Isometry3<f32>) -> [Point3<f32>; 4] {
    let chain = hand.finger(finger);
    let mut frame = world
        * Isometry3::from_parts(
            Translation3::from(chain.origin()),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), chain.roll()),
        );

    let mut points = [Point3::origin(); 4];
    points[0] = frame * Point3::origin();
    for (j, joint) in chain.joints().iter().enumerate() {
        frame *= UnitQuaternion::from_axis_angle(&Vector3::x_axis(), joint.angle());
        frame *= Translation3::new(0.0, joint.geometry().length, 0.0);
        points[j + 1] = frame * Point3::origin();
    }
    points
}

/// Everything to draw for one frame, in world space.
pub fn build_scene(hand: &HandModel) -> Vec<Primitive> {
    let world = hand_transform(hand);
    let mut out = Vec::with_capacity(64);

    push_cylinder(&mut out, hand.wrist(), &world);
    push_box(&mut out, hand.palm(), &world);
    push_box(&mut out, hand.palm_detail(), &world);

    for chain in hand.fingers() {
        let pts = finger_points(hand, chain.finger(), &world);
        for (j, joint) in chain.joints().iter().enumerate() {
            let g = joint.geometry();
            out.push(Primitive::Segment {
                a: pts[j], b: pts[j + 1], ra: g.radius, rb: g.tip_radius, color: g.color,
            });
            out.push(Primitive::Sphere { center: pts[j], radius: JOINT_RADIUS, color: JOINT_COLOR });
        }
    }
    out
}

fn push_box(out: &mut Vec<Primitive>, part: &BoxPart, world: &Isometry3<f32>) {
    let h = part.size / 2.0;
    let c = part.center;
    let corner = |sx: f32, sy: f32, sz: f32| {
        world * Point3::new(c.x + sx * h.x, c.y + sy * h.y, c.z + sz * h.z)
    };
    // (normal, four corners wound counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([ 1.0, 0.0, 0.0], [[ 1.,-1.,-1.], [ 1., 1.,-1.], [ 1., 1., 1.], [ 1.,-1., 1.]]),
        ([-1.0, 0.0, 0.0], [[-1.,-1., 1.], [-1., 1., 1.], [-1., 1.,-1.], [-1.,-1.,-1.]]),
        ([ 0.0, 1.0, 0.0], [[-1., 1.,-1.], [-1., 1., 1.], [ 1., 1., 1.], [ 1., 1.,-1.]]),
        ([ 0.0,-1.0, 0.0], [[-1.,-1., 1.], [-1.,-1.,-1.], [ 1.,-1.,-1.], [ 1.,-1., 1.]]),
        ([ 0.0, 0.0, 1.0], [[-1.,-1., 1.], [ 1.,-1., 1.], [ 1., 1., 1.], [-1., 1., 1.]]),
        ([ 0.0, 0.0,-1.0], [[-1., 1.,-1.], [ 1., 1.,-1.], [ 1.,-1.,-1.], [-1.,-1.,-1.]]),
    ];
    for (n, quad) in faces {
        out.push(Primitive::Face {
            points: quad.iter().map(|s| corner(s[0], s[1], s[2])).collect(),
            normal: world * Vector3::new(n[0], n[1], n[2]),
            color:  part.color,
        });
    }
}

fn push_cylinder(out: &mut Vec<Primitive>, part: &CylinderPart, world: &Isometry3<f32>) {
    let half = part.height / 2.0;
    let ring = |r: f32, y: f32| -> Vec<Point3<f32>> {
        (0..CYLINDER_SIDES)
            .map(|i| {
                let a = TAU * i as f32 / CYLINDER_SIDES as f32;
                world * (Point3::from(part.center) + Vector3::new(r * a.cos(), y, r * a.sin()))
            })
            .collect()
    };
    let top    = ring(part.top_radius,     half);
    let bottom = ring(part.bottom_radius, -half);

    let slope = (part.bottom_radius - part.top_radius) / part.height;
    for i in 0..CYLINDER_SIDES {
        let k = (i + 1) % CYLINDER_SIDES;
        let mid = TAU * (i as f32 + 0.5) / CYLINDER_SIDES as f32;
        let n = Vector3::new(mid.cos(), slope, mid.sin()).normalize();
        out.push(Primitive::Face {
            points: vec![bottom[i], bottom[k], top[k], top[i]],
            normal: world * n,
            color:  part.color,
        });
    }
    out.push(Primitive::Face { points: top,    normal: world * Vector3::y(),  color: part.color });
    out.push(Primitive::Face { points: bottom, normal: world * -Vector3::y(), color: part.color });
}

// ════════════════════════════════════════════════════════════════════════════
// Camera and screen-space draw items
// ════════════════════════════════════════════════════════════════════════════

/// A projected point: pixel coordinates plus distance in front of the eye.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x:     f32,
    pub y:     f32,
    pub depth: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Disc    { x: f32, y: f32, r: f32 },
    Capsule { a: (f32, f32), b: (f32, f32), ra: f32, rb: f32 },
    Polygon(Vec<(f32, f32)>),
}

/// A shaded, projected primitive.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    pub shape: Shape,
    pub color: u32,
    pub depth: f32,
}

/// Perspective camera on the +z axis looking at the origin.
#[derive(Clone, Debug)]
pub struct Camera {
    eye:        Point3<f32>,
    fovy:       f32,
    width:      usize,
    height:     usize,
    projection: Perspective3<f32>,
    light:      Vector3<f32>,
}

impl Camera {
    pub const Z_NEAR: f32 = 0.1;
    pub const Z_FAR:  f32 = 1000.0;

    /// 45° vertical field of view, eye at z = 10.
    pub fn new(width: usize, height: usize) -> Self {
        let fovy = 45f32.to_radians();
        Camera {
            eye: Point3::new(0.0, 0.0, 10.0),
            fovy,
            width,
            height,
            projection: Perspective3::new(aspect(width, height), fovy, Self::Z_NEAR, Self::Z_FAR),
            light: Vector3::new(5.0, 5.0, 5.0).normalize(),
        }
    }

    /// Follow the surface size; the aspect ratio is recomputed.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.width, self.height) {
            self.width  = width;
            self.height = height;
            self.projection.set_aspect(aspect(width, height));
        }
    }

    pub fn size(&self) -> (usize, usize) { (self.width, self.height) }

    pub fn aspect(&self) -> f32 { self.projection.aspect() }

    /// Pixels per world unit at unit distance.
    fn focal_px(&self) -> f32 {
        self.height as f32 / 2.0 / (self.fovy / 2.0).tan()
    }

    /// `None` for points behind the near plane.
    pub fn project(&self, p: &Point3<f32>) -> Option<ScreenPoint> {
        let view = p - self.eye.coords;
        let depth = -view.z;
        if depth < Self::Z_NEAR {
            return None;
        }
        let ndc = self.projection.project_point(&view);
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * self.width as f32,
            y: (1.0 - ndc.y) * 0.5 * self.height as f32,
            depth,
        })
    }

    /// Screen radius of a world-space sphere of `radius` at `depth`.
    pub fn pixel_radius(&self, radius: f32, depth: f32) -> f32 {
        radius * self.focal_px() / depth.max(Self::Z_NEAR)
    }

    /// Project, cull back faces, shade and sort far to near.
    pub fn project_scene(&self, scene: &[Primitive]) -> Vec<DrawItem> {
        let mut items: Vec<DrawItem> = scene.iter().filter_map(|p| self.project_one(p)).collect();
        items.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        items
    }

    fn project_one(&self, prim: &Primitive) -> Option<DrawItem> {
        let depth = (self.eye - prim.centroid()).norm();
        match prim {
            Primitive::Sphere { center, radius, color } => {
                let s = self.project(center)?;
                Some(DrawItem {
                    shape: Shape::Disc { x: s.x, y: s.y, r: self.pixel_radius(*radius, s.depth) },
                    color: *color,
                    depth,
                })
            }
            Primitive::Segment { a, b, ra, rb, color } => {
                let (sa, sb) = (self.project(a)?, self.project(b)?);
                let axis = (b - a).normalize();
                // Lit by how much the segment faces the light sideways.
                let n = (self.light - axis * axis.dot(&self.light)).normalize();
                Some(DrawItem {
                    shape: Shape::Capsule {
                        a:  (sa.x, sa.y),
                        b:  (sb.x, sb.y),
                        ra: self.pixel_radius(*ra, sa.depth),
                        rb: self.pixel_radius(*rb, sb.depth),
                    },
                    color: self.shade(*color, &n),
                    depth,
                })
            }
            Primitive::Face { points, normal, color } => {
                let to_eye = self.eye - points.first()?;
                if normal.dot(&to_eye) <= 0.0 {
                    return None;
                }
                let poly = points
                    .iter()
                    .map(|p| self.project(p).map(|s| (s.x, s.y)))
                    .collect::<Option<Vec<_>>>()?;
                Some(DrawItem { shape: Shape::Polygon(poly), color: self.shade(*color, normal), depth })
            }
        }
    }

    /// Hemisphere ambient plus one directional light.
    fn shade(&self, color: u32, normal: &Vector3<f32>) -> u32 {
        let n = normal.try_normalize(1e-6).unwrap_or_else(Vector3::z);
        let sky     = 0.5 + 0.5 * n.y;
        let diffuse = n.dot(&self.light).max(0.0);
        let k = (0.45 + 0.25 * sky + 0.35 * diffuse).min(1.15);
        scale_color(color, k)
    }
}

fn aspect(width: usize, height: usize) -> f32 {
    if width == 0 || height == 0 { 1.0 } else { width as f32 / height as f32 }
}

fn scale_color(c: u32, k: f32) -> u32 {
    let ch = |shift: u32| (((c >> shift) & 0xFF) as f32 * k).round().clamp(0.0, 255.0) as u32;
    0xFF00_0000 | (ch(16) << 16) | (ch(8) << 8) | ch(0)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animator::{AnimationConfig, Animator};
    use emg_stream::Gesture;
    use std::time::Duration;

    #[test]
    fn origin_projects_to_centre() {
        let cam = Camera::new(800, 600);
        let s = cam.project(&Point3::origin()).unwrap();
        assert!((s.x - 400.0).abs() < 1e-3);
        assert!((s.y - 300.0).abs() < 1e-3);
        assert!((s.depth - 10.0).abs() < 1e-5);
    }

    #[test]
    fn up_is_up_on_screen() {
        let cam = Camera::new(800, 600);
        let s = cam.project(&Point3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(s.x > 400.0 && s.y < 300.0);
    }

    #[test]
    fn behind_camera_is_culled() {
        let cam = Camera::new(800, 600);
        assert!(cam.project(&Point3::new(0.0, 0.0, 11.0)).is_none());
    }

    #[test]
    fn resize_follows_aspect() {
        let mut cam = Camera::new(800, 600);
        cam.resize(1200, 300);
        assert!((cam.aspect() - 4.0).abs() < 1e-5);
        // A point at the top of the vertical fov still lands on row 0.
        let top = (22.5f32).to_radians().tan() * 10.0;
        let s = cam.project(&Point3::new(0.0, top, 0.0)).unwrap();
        assert!(s.y.abs() < 0.5, "{}", s.y);
    }

    #[test]
    fn zero_surface_does_not_poison_projection() {
        let mut cam = Camera::new(800, 600);
        cam.resize(0, 0);
        assert_eq!(cam.aspect(), 1.0);
        cam.resize(640, 480);
        assert!(cam.project(&Point3::origin()).is_some());
    }

    #[test]
    fn chain_keeps_segment_lengths() {
        let hand = HandModel::new(Gesture::Fist);
        let pts = finger_points(&hand, Finger::Middle, &Isometry3::identity());
        let len: f32 = pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        assert!((len - 2.2).abs() < 1e-4);
        assert!((pts[0].coords - hand.finger(Finger::Middle).origin()).norm() < 1e-6);
    }

    #[test]
    fn fist_pulls_tips_toward_palm() {
        let tip_height = |g: Gesture| {
            let mut a = Animator::new(AnimationConfig::default(), g);
            a.tick(g, Duration::ZERO);
            finger_points(a.hand(), Finger::Index, &Isometry3::identity())[3].y
        };
        assert!(tip_height(Gesture::Fist) < tip_height(Gesture::Open) - 1.0);
    }

    #[test]
    fn scene_is_sorted_back_to_front() {
        let hand = HandModel::new(Gesture::Pinch);
        let scene = build_scene(&hand);
        // 15 segments + 15 joint spheres + 12 box faces + cylinder
        assert_eq!(scene.len(), 30 + 12 + CYLINDER_SIDES + 2);

        let items = Camera::new(1100, 640).project_scene(&scene);
        assert!(!items.is_empty() && items.len() < scene.len());
        assert!(items.windows(2).all(|w| w[0].depth >= w[1].depth));
    }

    #[test]
    fn shading_keeps_alpha_opaque() {
        let cam = Camera::new(10, 10);
        let c = cam.shade(0xFF1A237E, &Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(c >> 24, 0xFF);
        assert_eq!(scale_color(0xFF808080, 3.0), 0xFFFFFFFF);
    }
}
