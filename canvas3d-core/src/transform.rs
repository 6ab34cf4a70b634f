/// Per-object transform state and model matrix construction
use nalgebra::{Matrix4, Vector3};

use crate::error::SceneError;

/// Rotation amounts around the three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Rotate by delta amounts (in radians)
    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.x += dx;
        self.y += dy;
        self.z += dz;
    }

    pub fn advance(&mut self, velocity: &RotationState) {
        self.rotate(velocity.x, velocity.y, velocity.z);
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for RotationState {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Matrix builders used by the transform pipeline
pub struct Transform;

impl Transform {
    /// Rotation about X, then Y, then Z, composed by post-multiplication
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::from_axis_angle(&Vector3::x_axis(), rotation.x);
        let ry = Matrix4::from_axis_angle(&Vector3::y_axis(), rotation.y);
        let rz = Matrix4::from_axis_angle(&Vector3::z_axis(), rotation.z);

        rx * ry * rz
    }

    pub fn translation_matrix(translation: &Vector3<f32>) -> Matrix4<f32> {
        Matrix4::new_translation(translation)
    }

    pub fn scale_matrix(scale: f32) -> Matrix4<f32> {
        Matrix4::new_scaling(scale)
    }
}

/// Reject scales that would collapse or mirror geometry
pub fn validate_scale(scale: f32) -> Result<f32, SceneError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(scale)
    } else {
        Err(SceneError::InvalidScale(scale))
    }
}

/// Scale, translation and rotation state of one scene object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTransform {
    scale: f32,
    pub translation: Vector3<f32>,
    pub rotation_velocity: RotationState,
    pub accumulated_rotation: RotationState,
}

impl ObjectTransform {
    pub fn new(
        scale: f32,
        translation: Vector3<f32>,
        rotation_velocity: RotationState,
    ) -> Result<Self, SceneError> {
        Ok(Self {
            scale: validate_scale(scale)?,
            translation,
            rotation_velocity,
            accumulated_rotation: RotationState::zero(),
        })
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<(), SceneError> {
        self.scale = validate_scale(scale)?;
        Ok(())
    }

    /// Current model matrix without advancing the animation
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Transform::scale_matrix(self.scale)
            * Transform::translation_matrix(&self.translation)
            * Transform::rotation_matrix(&self.accumulated_rotation)
    }

    /// Advance the accumulated rotation by one frame of velocity and return
    /// the model matrix for that frame.
    ///
    /// Must be called exactly once per object per frame.
    pub fn advance_and_model_matrix(&mut self) -> Matrix4<f32> {
        self.accumulated_rotation.advance(&self.rotation_velocity);
        self.model_matrix()
    }

    /// Stop the animation: zero both the velocity and the accumulated rotation
    pub fn stop(&mut self) {
        self.rotation_velocity = RotationState::zero();
        self.accumulated_rotation = RotationState::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_state() {
        let mut state = RotationState::zero();
        assert!(state.is_zero());

        state.rotate(0.1, 0.2, 0.3);
        assert!((state.x - 0.1).abs() < 1e-6);
        assert!((state.y - 0.2).abs() < 1e-6);
        assert!((state.z - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_identity_rotation() {
        let matrix = Transform::rotation_matrix(&RotationState::zero());
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_rotation_order_is_x_then_y_then_z() {
        let rotation = RotationState::new(FRAC_PI_2, FRAC_PI_2, 0.0);
        let matrix = Transform::rotation_matrix(&rotation);

        // Post-multiplied: the point is rotated about Y first, then about X.
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-6);

        let reversed = Matrix4::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2)
            * Matrix4::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        assert!((matrix - reversed).norm() > 1e-3);
    }

    #[test]
    fn test_translation_is_scaled() {
        let transform =
            ObjectTransform::new(2.0, Vector3::new(1.0, 0.0, -1.0), RotationState::zero()).unwrap();
        let origin = transform.model_matrix().transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(2.0, 0.0, -2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_model_matrix_composition() {
        let mut transform =
            ObjectTransform::new(0.5, Vector3::new(0.0, 2.0, 0.0), RotationState::zero()).unwrap();
        transform.accumulated_rotation = RotationState::new(0.0, 0.0, FRAC_PI_2);

        let expected = Matrix4::new_scaling(0.5)
            * Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0))
            * Matrix4::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        assert_relative_eq!(transform.model_matrix(), expected, epsilon = 1e-6);

        // Rotation applies first, then translation, then scale
        let p = transform.model_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.5, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_advance_accumulates_velocity() {
        let mut transform =
            ObjectTransform::new(1.0, Vector3::zeros(), RotationState::new(0.1, 0.0, 0.02)).unwrap();
        for _ in 0..10 {
            transform.advance_and_model_matrix();
        }
        assert_relative_eq!(transform.accumulated_rotation.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(transform.accumulated_rotation.y, 0.0);
        assert_relative_eq!(transform.accumulated_rotation.z, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_model_matrix_has_no_side_effect() {
        let transform =
            ObjectTransform::new(1.0, Vector3::zeros(), RotationState::new(0.0, 0.5, 0.0)).unwrap();
        let first = transform.model_matrix();
        let second = transform.model_matrix();
        assert_eq!(first, second);
        assert!(transform.accumulated_rotation.is_zero());
    }

    #[test]
    fn test_invalid_scale_rejected() {
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(ObjectTransform::new(scale, Vector3::zeros(), RotationState::zero()).is_err());
        }

        let mut transform =
            ObjectTransform::new(0.5, Vector3::zeros(), RotationState::zero()).unwrap();
        assert!(matches!(transform.set_scale(0.0), Err(SceneError::InvalidScale(_))));
        assert_eq!(transform.scale(), 0.5);
    }

    #[test]
    fn test_stop_resets_rotation() {
        let mut transform =
            ObjectTransform::new(1.0, Vector3::zeros(), RotationState::new(0.1, 0.1, 0.1)).unwrap();
        transform.advance_and_model_matrix();
        transform.stop();
        assert!(transform.rotation_velocity.is_zero());
        assert!(transform.accumulated_rotation.is_zero());
    }
}
