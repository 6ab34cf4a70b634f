/// Scene lighting pushed to the render backend every frame
use nalgebra::Vector3;

use crate::geometry::Rgb;

/// A light shining uniformly along `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Rgb,
    /// Direction the light travels in, not necessarily normalized
    pub direction: Vector3<f32>,
}

impl DirectionalLight {
    pub fn new(color: Rgb, direction: Vector3<f32>) -> Self {
        Self { color, direction }
    }

    /// Unit vector pointing from a surface towards the light
    pub fn towards_light(&self) -> Vector3<f32> {
        (-self.direction)
            .try_normalize(1e-12)
            .unwrap_or_else(Vector3::z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lighting {
    pub ambient: Rgb,
    pub directional: Option<DirectionalLight>,
}

impl Lighting {
    /// Light reaching a surface with the given normal.
    ///
    /// Surfaces without a known normal only receive ambient light.
    pub fn intensity(&self, normal: Option<&Vector3<f32>>) -> Rgb {
        let mut light = self.ambient;
        if let (Some(sun), Some(normal)) = (self.directional, normal) {
            let facing = normal.dot(&sun.towards_light()).max(0.0);
            for (channel, color) in light.iter_mut().zip(sun.color) {
                *channel += color * facing;
            }
        }
        light
    }

    /// Scalar brightness in `[0, 1]`, the mean of the clamped channels
    pub fn brightness(&self, normal: Option<&Vector3<f32>>) -> f32 {
        let light = self.intensity(normal);
        light.iter().map(|c| c.clamp(0.0, 1.0)).sum::<f32>() / 3.0
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: [0.6, 0.6, 0.6],
            directional: Some(DirectionalLight::new(
                [0.5, 0.5, 0.5],
                Vector3::new(-0.5, -0.7, -1.0),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ambient_only_ignores_normals() {
        let lighting = Lighting {
            ambient: [0.2, 0.3, 0.4],
            directional: None,
        };
        let normal = Vector3::z();
        assert_eq!(lighting.intensity(Some(&normal)), [0.2, 0.3, 0.4]);
        assert_eq!(lighting.intensity(None), [0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_directional_contribution() {
        let lighting = Lighting {
            ambient: [0.1, 0.1, 0.1],
            directional: Some(DirectionalLight::new([1.0, 0.5, 0.0], -Vector3::z())),
        };

        let facing = lighting.intensity(Some(&Vector3::z()));
        assert_relative_eq!(facing[0], 1.1);
        assert_relative_eq!(facing[1], 0.6);
        assert_relative_eq!(facing[2], 0.1);

        let away = lighting.intensity(Some(&-Vector3::z()));
        assert_eq!(away, [0.1, 0.1, 0.1]);
    }

    #[test]
    fn test_brightness_is_clamped() {
        let lighting = Lighting {
            ambient: [2.0, 2.0, 2.0],
            directional: None,
        };
        assert_relative_eq!(lighting.brightness(None), 1.0);
    }
}
