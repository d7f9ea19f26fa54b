use crate::ParserError;
use crate::common::types::{AssetId, ObjectId};
use crate::mesh::types::MeshData;
use crate::scene::reader::SceneReader;
use crate::scene::types::{AssetPayload, ColliderShape, ComponentPayload, RenderMode};

const AVATAR_DOCUMENT: &str = r#"
{
  "root": {
    "id": 1,
    "name": "Avatar",
    "components": [
      { "type": "HumanoidRig", "id": 10, "bones": [ { "bone": "Hips", "node": 2 } ] },
      { "type": "AvatarDescriptor", "id": 11, "view_position": [0.0, 1.5, 0.05] },
      { "type": "VRCStation", "id": 12, "seated": true }
    ],
    "children": [
      {
        "id": 2,
        "name": "Armature_Hips",
        "transform": { "position": [0.0, 1.0, 0.0] },
        "components": [
          { "type": "DynamicBoneCollider", "id": 20, "shape": "Capsule", "radius": 0.1, "height": 0.3 },
          { "type": "FirstPersonVisibility", "visible": false, "enabled": false }
        ]
      },
      {
        "id": 3,
        "name": "Body",
        "components": [
          { "type": "SkinnedMeshRenderer", "id": 30, "mesh": 100, "materials": [101], "bones": [2], "root_bone": 2 }
        ]
      }
    ]
  },
  "assets": [
    { "id": 100, "name": "Body", "type": "Mesh", "file": "meshes/body.rgms" },
    { "id": 101, "name": "Skin", "type": "Material", "stable_id": "f00d", "render_mode": "Cutout", "main_texture": 102 },
    { "id": 102, "name": "Skin_albedo", "type": "Texture", "width": 512, "height": 512, "file": "tex/skin.png" },
    { "id": 103, "name": "Wobble", "type": "AnimationClip" }
  ]
}
"#;

#[test]
fn parse_avatar_document() -> Result<(), anyhow::Error> {
    let document = SceneReader::parse_document(&mut AVATAR_DOCUMENT.as_bytes())?;

    assert_eq!(document.root.id, ObjectId(1));
    assert_eq!(document.root.subtree_len(), 3);
    assert_eq!(document.root.components.len(), 3);
    assert!(matches!(
        &document.root.components[2].payload,
        ComponentPayload::Unknown { tag } if tag == "VRCStation"
    ));

    let hips = &document.root.children[0];
    assert_eq!(hips.transform.position, [0.0, 1.0, 0.0]);
    assert_eq!(hips.transform.rotation, [0.0, 0.0, 0.0, 1.0]);
    match &hips.components[0].payload {
        ComponentPayload::DynamicBoneCollider(collider) => {
            assert_eq!(collider.shape, ColliderShape::Capsule);
            assert_eq!(collider.height, 0.3);
        }
        other => panic!("Unexpected payload {:?}", other),
    }

    // unset identifiers default to null, the enabled flag is read next to the payload
    assert!(hips.components[1].id.is_null());
    assert!(!hips.components[1].enabled);

    match &document.root.components[1].payload {
        ComponentPayload::AvatarDescriptor(descriptor) => {
            assert_eq!(descriptor.view_position, [0.0, 1.5, 0.05]);
            assert!(descriptor.hide_head_in_first_person);
            assert!(descriptor.left_eye.is_null());
        }
        other => panic!("Unexpected payload {:?}", other),
    }

    assert_eq!(document.assets.len(), 4);
    assert_eq!(document.assets[1].stable_id.as_deref(), Some("f00d"));
    match &document.assets[1].payload {
        AssetPayload::Material(material) => {
            assert_eq!(material.render_mode, RenderMode::Cutout);
            assert_eq!(material.main_texture, AssetId(102));
            assert_eq!(material.color, [1.0; 4]);
        }
        other => panic!("Unexpected payload {:?}", other),
    }
    assert_eq!(document.assets[3].payload.type_tag(), "AnimationClip");

    Ok(())
}

#[test]
fn external_meshes_can_be_inlined() -> Result<(), anyhow::Error> {
    let mut document = SceneReader::parse_document_str(AVATAR_DOCUMENT)?;

    let external = SceneReader::external_mesh_files(&document);
    assert_eq!(external, vec![(AssetId(100), "meshes/body.rgms".to_string())]);

    assert!(SceneReader::attach_mesh_data(&mut document, AssetId(100), MeshData::default()));
    assert!(!SceneReader::attach_mesh_data(&mut document, AssetId(101), MeshData::default()));
    assert!(SceneReader::external_mesh_files(&document).is_empty());

    Ok(())
}

#[test]
fn null_asset_identifier_is_rejected() {
    let json = r#"{ "root": { "id": 1, "name": "Root" }, "assets": [ { "id": 0, "type": "Texture" } ] }"#;
    assert!(matches!(
        SceneReader::parse_document_str(json),
        Err(ParserError::FormatError { .. })
    ));
}

#[test]
fn malformed_known_payload_is_an_error() {
    let json = r#"{ "root": { "id": 1, "components": [ { "type": "MeshRenderer", "mesh": "not-an-id" } ] } }"#;
    assert!(matches!(
        SceneReader::parse_document_str(json),
        Err(ParserError::JsonError(_))
    ));
}
