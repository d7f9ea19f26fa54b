use glam::{Quat, Vec3, Vec4};
use rigport_files::common::types::TransformData;

use crate::engine::components::hierarchy::Transform;

pub fn array_as_color(data: [f32; 4]) -> Vec4 {
    Vec4::from_array(data)
}

/// Quaternions coming from authoring tools are not always normalized. Degenerate ones become identity.
pub fn quat_from_xyzw(data: [f32; 4]) -> Quat {
    let quat = Quat::from_array(data);
    if quat.length_squared() <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        quat.normalize()
    }
}

pub fn transform_from_data(data: &TransformData) -> Transform {
    Transform {
        translation: Vec3::from_array(data.position),
        rotation: quat_from_xyzw(data.rotation),
        scale: Vec3::from_array(data.scale),
    }
}

/// The first `len` characters, for display purposes.
pub fn short_id(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_rotation_is_identity() {
        assert_eq!(quat_from_xyzw([0.0; 4]), Quat::IDENTITY);
        let rotation = quat_from_xyzw([0.0, 0.0, 2.0, 0.0]);
        assert!(rotation.is_normalized());
    }

    #[test]
    fn short_ids() {
        assert_eq!(short_id("0123456789abcdef", 8), "01234567");
        assert_eq!(short_id("abc", 8), "abc");
    }
}
