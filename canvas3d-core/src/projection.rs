/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};

/// Fixed editor view: model matrices map straight into clip space, corrected
/// for aspect and with +Z pointing at the viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub aspect: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
        }
    }

    /// Adjust the aspect ratio for a viewport whose pixels are not square
    pub fn with_pixel_aspect(mut self, pixel_aspect: f32) -> Self {
        self.aspect *= pixel_aspect;
        self
    }

    /// View-projection matrix, to be multiplied with a model matrix.
    ///
    /// The longer viewport axis is squeezed so unit geometry stays square.
    pub fn view_projection(&self) -> Matrix4<f32> {
        let (sx, sy) = if self.aspect >= 1.0 {
            (1.0 / self.aspect, 1.0)
        } else {
            (1.0, self.aspect)
        };
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, -1.0))
    }

    /// Project a point through `mvp` to screen space.
    ///
    /// Returns `(x, y, depth)` with depth in normalized device coordinates
    /// (smaller is closer), or `None` when the point falls outside the view
    /// volume.
    pub fn project_to_screen(
        point: &Point3<f32>,
        mvp: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let clip = mvp * point.to_homogeneous();

        // Prevent division by near-zero w
        if clip.w.abs() < 1e-6 {
            return None;
        }
        let ndc = clip.xyz() / clip.w;

        // Clip test
        if ndc.iter().any(|c| !(-1.0..=1.0).contains(c)) {
            return None;
        }

        // Convert to screen space
        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);

        let terminal = Camera::new(100, 50).with_pixel_aspect(0.5);
        assert!((terminal.aspect - 1.0).abs() < 1e-6);

        assert!((Camera::new(10, 0).aspect - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_correction() {
        let wide = Camera::new(200, 100).view_projection();
        let corner = wide.transform_point(&Point3::new(1.0, 1.0, 0.0));
        assert!((corner.x - 0.5).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);

        let tall = Camera::new(100, 200).view_projection();
        let corner = tall.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 0.5).abs() < 1e-6);
        assert!((corner.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_clip_space_projection() {
        let camera = Camera::new(200, 100);
        let mvp = camera.view_projection();

        let (x, y, depth) =
            Camera::project_to_screen(&Point3::new(0.0, 0.0, 0.5), &mvp, 200, 100).unwrap();
        assert!((x - 100.0).abs() < 1e-4);
        assert!((y - 50.0).abs() < 1e-4);
        // Closer to the viewer means smaller depth
        assert!((depth + 0.5).abs() < 1e-6);

        // Top edge maps to row zero
        let (_, top, _) =
            Camera::project_to_screen(&Point3::new(0.0, 1.0, 0.0), &mvp, 200, 100).unwrap();
        assert!(top.abs() < 1e-4);

        assert!(Camera::project_to_screen(&Point3::new(0.0, 0.0, 1.5), &mvp, 200, 100).is_none());
    }
}
