pub mod rig_detection_system;
pub mod transform_system;
