use glam::{Affine3A, Mat4, Vec2, Vec3, Vec4};

/// Camera snapshot consumed by the render path.
///
/// Cached matrices are read-only for the renderer and refreshed whenever the
/// transform, projection or jitter changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    world_matrix: Affine3A,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_projection_matrix: Mat4,
    /// Sub-pixel offset in clip space.
    jitter: Vec2,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl Camera {
    #[must_use]
    pub fn new_perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
            world_matrix: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            jitter: Vec2::ZERO,
        };
        cam.update_projection_matrix();
        cam
    }

    /// Places the camera at `position` looking along `forward`.
    #[must_use]
    pub fn looking_to(mut self, position: Vec3, forward: Vec3, up: Vec3) -> Self {
        let view = Mat4::look_to_rh(position, forward.normalize(), up.normalize());
        self.update_view_projection(&Affine3A::from_mat4(view.inverse()));
        self
    }

    pub fn update_projection_matrix(&mut self) {
        let projection = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        self.projection_matrix =
            Mat4::from_translation(Vec3::new(self.jitter.x, self.jitter.y, 0.0)) * projection;
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    pub fn update_view_projection(&mut self, world_transform: &Affine3A) {
        self.world_matrix = *world_transform;
        self.view_matrix = Mat4::from(*world_transform).inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Applies a clip-space sub-pixel offset to the projection.
    pub fn set_jitter(&mut self, jitter: Vec2) {
        self.jitter = jitter;
        self.update_projection_matrix();
    }

    #[inline]
    #[must_use]
    pub fn jitter(&self) -> Vec2 {
        self.jitter
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world_matrix.translation.into()
    }

    /// Viewing direction (the camera looks down its local -Z).
    #[inline]
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (-Vec3::from(self.world_matrix.matrix3.z_axis)).normalize()
    }

    #[inline]
    #[must_use]
    pub fn up(&self) -> Vec3 {
        Vec3::from(self.world_matrix.matrix3.y_axis).normalize()
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.view_projection_matrix
    }

    /// Mirror image of this camera across `plane` (`xyz` normal, `w` offset,
    /// points satisfy `dot(n, p) + w = 0`).
    ///
    /// Position, forward and up are mirrored individually and the view is
    /// rebuilt, so the reflected camera keeps a right-handed basis.
    #[must_use]
    pub fn reflected(&self, plane: Vec4) -> Self {
        let normal = plane.truncate();
        let length = normal.length();
        if length <= f32::EPSILON {
            return *self;
        }
        let normal = normal / length;
        let offset = plane.w / length;

        let position = self.position();
        let position = position - 2.0 * (normal.dot(position) + offset) * normal;
        let reflect_dir = |v: Vec3| v - 2.0 * normal.dot(v) * normal;

        let mut reflected = *self;
        reflected.jitter = Vec2::ZERO;
        reflected.update_projection_matrix();
        reflected.looking_to(position, reflect_dir(self.forward()), reflect_dir(self.up()))
    }
}
