use std::future::Future;
use std::pin::pin;
use std::task::{Context, Waker};

use glam::Mat4;
use rigport::conversion::error::ConversionError;
use rigport::conversion::{Converter, Milestone};
use rigport::engine::Engine;
use rigport::engine::assets::{AssetLoad, AssetName, BlendMode, LoadState, MaterialAsset, MeshAsset};
use rigport::engine::components::avatar::{BipedRig, DynamicBoneChain, DynamicBoneCollider};
use rigport::engine::components::hierarchy::{Slot, SourceReference};
use rigport::engine::components::render::{FirstPersonMaterials, MeshRenderer, SkinnedMeshRenderer};
use rigport::engine::humanoid::HumanBone;
use rigport::export::PackagedGraph;
use rigport::settings::ConversionSettings;
use rigport_files::common::types::{AssetId, ObjectId};
use rigport_files::mesh::types::{BoneWeightData, MeshData, SubmeshData};
use rigport_files::scene::reader::SceneReader;
use rigport_files::scene::types::{Component, ComponentPayload, MeshRendererData, SceneDocument};

fn converter() -> Converter {
    Converter::new(ConversionSettings::default()).expect("default builders register")
}

fn document(json: &str) -> SceneDocument {
    SceneReader::parse_document_str(json).expect("test document parses")
}

/// One triangle per entry, all three vertices fully weighted to that bone.
fn skinned_triangles(bones_per_triangle: &[u32], bone_count: usize) -> MeshData {
    let vertex_count = bones_per_triangle.len() * 3;
    MeshData {
        positions: (0..vertex_count).map(|v| [v as f32, 0.0, 0.0]).collect(),
        bind_poses: vec![Mat4::IDENTITY.to_cols_array(); bone_count],
        bone_weights: bones_per_triangle
            .iter()
            .flat_map(|&bone| vec![vec![BoneWeightData { bone, weight: 1.0 }]; 3])
            .collect(),
        submeshes: vec![SubmeshData {
            indices: (0..vertex_count as u32).collect(),
            ..SubmeshData::default()
        }],
        ..MeshData::default()
    }
}

const SINGLE_RENDERER: &str = r#"{
    "root": {
        "id": 1,
        "name": "Avatar",
        "components": [ { "type": "MeshRenderer", "mesh": 10 } ]
    },
    "assets": [
        {
            "id": 10,
            "name": "Quad",
            "type": "Mesh",
            "data": {
                "positions": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
                "submeshes": [ { "indices": [0, 1, 2, 0, 2, 3] } ]
            }
        }
    ]
}"#;

#[test_log::test(tokio::test)]
async fn single_renderer_is_bound_to_its_mesh() -> anyhow::Result<()> {
    let mut engine = Engine::default();
    let mut milestones = vec![];
    let avatar = converter()
        .convert(&mut engine, &document(SINGLE_RENDERER), |milestone| milestones.push(milestone))
        .await?;

    assert_eq!(
        milestones,
        vec![Milestone::ConvertingAssets, Milestone::ConvertingObjects, Milestone::Finalizing]
    );
    assert_eq!(avatar.registry.len(), 2);
    assert_eq!(avatar.registry.get(ObjectId(1)), Some(avatar.root));

    let world = engine.world();
    let mesh = avatar.registry.get(AssetId(10)).expect("mesh is registered");
    let renderers = engine
        .attached(avatar.root)
        .into_iter()
        .filter(|&component| world.get::<&MeshRenderer>(component).is_ok())
        .collect::<Vec<_>>();
    assert_eq!(renderers.len(), 1);
    assert_eq!(world.get::<&MeshRenderer>(renderers[0])?.mesh, Some(mesh));
    assert_eq!(world.get::<&AssetLoad>(mesh)?.state, LoadState::Ready);

    // the null identifier never resolves, whatever the expected type
    assert!(matches!(avatar.registry.resolve::<Slot, _>(world, ObjectId::NULL), Ok(None)));
    assert!(matches!(avatar.registry.resolve::<MeshAsset, _>(world, AssetId::NULL), Ok(None)));
    assert!(matches!(
        avatar.registry.resolve::<MeshAsset, _>(world, ObjectId(1)),
        Err(ConversionError::ReferenceTypeMismatch { .. })
    ));

    assert_eq!(world.get::<&SourceReference>(mesh)?.id, 10);
    assert_eq!(world.get::<&SourceReference>(avatar.root)?.id, 1);

    // the asset container ends up inside the packaged tree
    let assets = engine.find_child(avatar.root, "Assets").expect("assets are moved under the root");
    assert_eq!(engine.attached(assets), vec![mesh]);

    let graph = PackagedGraph::capture(&engine, avatar.root);
    assert_eq!(graph.assets.len(), 1);
    assert_eq!(graph.root.components[0].mesh.as_deref(), Some("Quad"));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn unresolved_mesh_leaves_nothing_behind() {
    let json = r#"{
        "root": {
            "id": 1,
            "name": "Avatar",
            "children": [
                { "id": 2, "name": "Body", "components": [ { "type": "MeshRenderer", "mesh": 99 } ] }
            ]
        },
        "assets": [ { "id": 10, "name": "Skin", "type": "Material" } ]
    }"#;

    let mut engine = Engine::default();
    let result = converter().convert(&mut engine, &document(json), |_| {}).await;

    assert!(matches!(result, Err(ConversionError::UnresolvedReference { .. })));
    assert_eq!(engine.world().len(), 0);
}

#[test_log::test(tokio::test)]
async fn failed_required_mesh_aborts_the_conversion() {
    let json = r#"{
        "root": { "id": 1, "name": "Avatar", "components": [ { "type": "MeshRenderer", "mesh": 10 } ] },
        "assets": [
            {
                "id": 10,
                "name": "Broken",
                "type": "Mesh",
                "data": { "positions": [[0, 0, 0]], "submeshes": [ { "indices": [0, 1, 2] } ] }
            }
        ]
    }"#;

    let mut engine = Engine::default();
    let result = converter().convert(&mut engine, &document(json), |_| {}).await;

    match result {
        Err(ConversionError::AssetLoadFailure { asset, .. }) => assert_eq!(asset, "Broken"),
        other => panic!("Expected the mesh upload to fail, got {:?}", other.map(|avatar| avatar.root)),
    }
    assert_eq!(engine.world().len(), 0);
}

#[test_log::test(tokio::test)]
async fn abandoned_conversion_is_torn_down() {
    let mut engine = Engine::default();
    let converter = converter();
    let document = document(SINGLE_RENDERER);

    {
        let mut conversion = pin!(converter.convert(&mut engine, &document, |_| {}));
        let mut cx = Context::from_waker(Waker::noop());
        // the import runs synchronously, the first deferred step then waits for a tick
        assert!(conversion.as_mut().poll(&mut cx).is_pending());
    }

    assert_eq!(engine.world().len(), 0);
}

#[test_log::test(tokio::test)]
async fn rig_detection_only_sees_the_assigned_bones() -> anyhow::Result<()> {
    let json = r#"{
        "root": {
            "id": 1,
            "name": "Avatar",
            "components": [
                {
                    "type": "HumanoidRig",
                    "id": 10,
                    "bones": [
                        { "bone": "Hips", "node": 2 },
                        { "bone": "Spine", "node": 3 },
                        { "bone": "Head", "node": 5 },
                        { "bone": "Tail", "node": 6 }
                    ]
                }
            ],
            "children": [
                { "id": 7, "name": "head_accessory" },
                {
                    "id": 2,
                    "name": "Armature_Hips",
                    "children": [
                        {
                            "id": 3,
                            "name": "Spine",
                            "children": [
                                { "id": 4, "name": "HeadTop_End" },
                                { "id": 5, "name": "Kopf" }
                            ]
                        },
                        { "id": 6, "name": "Tail" }
                    ]
                }
            ]
        }
    }"#;

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document(json), |_| {}).await?;
    let node = |id| avatar.registry.get(ObjectId(id)).expect("node is registered");

    let rig = engine.world().get::<&BipedRig>(avatar.root)?.clone();
    assert!(rig.enabled);
    assert_eq!(rig.bones.len(), 3);
    assert_eq!(rig.bone(HumanBone::Hips), Some(node(2)));
    assert_eq!(rig.bone(HumanBone::Spine), Some(node(3)));
    assert_eq!(rig.bone(HumanBone::Head), Some(node(5)));

    for (id, name) in [
        (7, "head_accessory"),
        (2, "Armature_Hips"),
        (3, "Spine"),
        (4, "HeadTop_End"),
        (5, "Kopf"),
        (6, "Tail"),
    ] {
        assert_eq!(engine.name(node(id)).as_deref(), Some(name));
    }

    assert!(avatar.report.warnings.iter().any(|warning| warning.contains("Tail")));
    assert!(avatar.report.warnings.iter().any(|warning| warning.contains("missing required bones")));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn rig_root_is_never_detected_as_a_bone() -> anyhow::Result<()> {
    let json = r#"{
        "root": {
            "id": 1,
            "name": "ChestnutFox",
            "components": [
                {
                    "type": "HumanoidRig",
                    "id": 10,
                    "bones": [
                        { "bone": "Hips", "node": 2 },
                        { "bone": "Spine", "node": 3 },
                        { "bone": "Head", "node": 4 }
                    ]
                }
            ],
            "children": [
                {
                    "id": 2,
                    "name": "Hips",
                    "children": [
                        { "id": 3, "name": "Spine", "children": [ { "id": 4, "name": "Head" } ] }
                    ]
                }
            ]
        }
    }"#;

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document(json), |_| {}).await?;

    let rig = engine.world().get::<&BipedRig>(avatar.root)?.clone();
    assert_eq!(rig.bones.keys().copied().collect::<Vec<_>>(), [HumanBone::Hips, HumanBone::Spine, HumanBone::Head]);
    assert!(!rig.bones.values().any(|&bone| bone == avatar.root));
    assert_eq!(engine.name(avatar.root).as_deref(), Some("ChestnutFox"));
    Ok(())
}

const FIRST_PERSON: &str = r#"{
    "root": {
        "id": 1,
        "name": "Avatar",
        "components": [
            {
                "type": "HumanoidRig",
                "id": 10,
                "bones": [
                    { "bone": "Hips", "node": 2 },
                    { "bone": "Spine", "node": 3 },
                    { "bone": "Head", "node": 4 }
                ]
            },
            { "type": "AvatarDescriptor", "id": 11, "hide_head_in_first_person": true }
        ],
        "children": [
            {
                "id": 2,
                "name": "Hips",
                "children": [
                    {
                        "id": 3,
                        "name": "Spine",
                        "children": [
                            {
                                "id": 4,
                                "name": "Head",
                                "children": [
                                    {
                                        "id": 5,
                                        "name": "Hair",
                                        "components": [ { "type": "FirstPersonVisibility", "id": 50, "visible": true } ]
                                    }
                                ]
                            }
                        ]
                    }
                ]
            },
            {
                "id": 6,
                "name": "Body",
                "components": [
                    {
                        "type": "SkinnedMeshRenderer",
                        "id": 60,
                        "mesh": 100,
                        "materials": [200],
                        "bones": [2, 4, 5],
                        "root_bone": 2
                    }
                ]
            }
        ]
    },
    "assets": [
        { "id": 100, "name": "Body", "type": "Mesh", "file": "body.rgms" },
        { "id": 200, "name": "Skin", "type": "Material" }
    ]
}"#;

#[test_log::test(tokio::test)]
async fn head_geometry_is_split_off_for_first_person() -> anyhow::Result<()> {
    let mut document = document(FIRST_PERSON);
    // hips, head, hair: the hair flag overrides the hidden head
    assert!(SceneReader::attach_mesh_data(
        &mut document,
        AssetId(100),
        skinned_triangles(&[0, 1, 2], 3)
    ));

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document, |_| {}).await?;
    let world = engine.world();

    let mesh = avatar.registry.get(AssetId(100)).expect("mesh is registered");
    let skin = avatar.registry.get(AssetId(200)).expect("material is registered");
    let renderer = avatar.registry.get(ObjectId(60)).expect("renderer is registered");

    let live_mesh = world.get::<&MeshAsset>(mesh)?.mesh.clone();
    assert_eq!(live_mesh.submeshes.len(), 2);
    assert_eq!(live_mesh.submeshes[0].indices, vec![0, 1, 2, 6, 7, 8]);
    assert_eq!(live_mesh.submeshes[1].indices, vec![3, 4, 5]);
    assert_eq!(world.get::<&AssetLoad>(mesh)?.state, LoadState::Ready);

    let live_renderer = world.get::<&SkinnedMeshRenderer>(renderer)?;
    assert_eq!(live_renderer.mesh, Some(mesh));
    assert_eq!(live_renderer.materials, vec![Some(skin), Some(skin)]);
    assert_eq!(live_renderer.bones.len(), 3);

    let first_person = world.get::<&FirstPersonMaterials>(renderer)?;
    assert_eq!(first_person.0[0], Some(skin));
    let invisible = first_person.0[1].expect("the split off submesh is hidden");
    assert_eq!(world.get::<&AssetName>(invisible)?.0, "Invisible");
    assert_eq!(world.get::<&MaterialAsset>(invisible)?.blend, BlendMode::Invisible);

    assert!(avatar.report.timed_out_assets.is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn out_of_range_index_in_a_split_mesh_aborts_the_conversion() {
    let mut mesh = skinned_triangles(&[0, 1, 2], 3);
    mesh.submeshes[0].indices.extend([0, 1, 99]);
    let mut document = document(FIRST_PERSON);
    assert!(SceneReader::attach_mesh_data(&mut document, AssetId(100), mesh));

    let mut engine = Engine::default();
    let result = converter().convert(&mut engine, &document, |_| {}).await;

    assert!(matches!(result, Err(ConversionError::MalformedMeshIndex { .. })));
    assert_eq!(engine.world().len(), 0);
}

#[test_log::test(tokio::test)]
async fn fully_hidden_submesh_is_only_swapped_for_the_invisible_material() -> anyhow::Result<()> {
    // the head triangle sits in a submesh of its own, nothing has to be split
    let mut mesh = skinned_triangles(&[0, 1], 3);
    mesh.submeshes = vec![
        SubmeshData {
            indices: vec![0, 1, 2],
            ..SubmeshData::default()
        },
        SubmeshData {
            indices: vec![3, 4, 5],
            ..SubmeshData::default()
        },
    ];
    let mut document = document(FIRST_PERSON);
    assert!(SceneReader::attach_mesh_data(&mut document, AssetId(100), mesh));
    // shared with a static renderer, which would force a duplicate if anything was split
    let body = document
        .root
        .children
        .iter_mut()
        .find(|child| child.name == "Body")
        .expect("body node");
    body.components.push(Component::new(
        ObjectId(61),
        ComponentPayload::MeshRenderer(MeshRendererData {
            mesh: AssetId(100),
            materials: vec![],
        }),
    ));

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document, |_| {}).await?;
    let world = engine.world();

    let original = avatar.registry.get(AssetId(100)).expect("mesh is registered");
    let skinned = avatar.registry.get(ObjectId(60)).expect("skinned renderer");

    assert_eq!(world.get::<&SkinnedMeshRenderer>(skinned)?.mesh, Some(original));
    assert_eq!(world.get::<&MeshAsset>(original)?.mesh.submeshes.len(), 2);
    assert_eq!(world.get::<&AssetLoad>(original)?.generation, 1);
    assert!(
        world
            .query::<&AssetName>()
            .iter()
            .all(|(_, name)| !name.0.ends_with("_FirstPerson"))
    );

    let first_person = world.get::<&FirstPersonMaterials>(skinned)?;
    let invisible = first_person.0[1].expect("the head submesh is hidden");
    assert_eq!(world.get::<&MaterialAsset>(invisible)?.blend, BlendMode::Invisible);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn shared_mesh_is_duplicated_before_splitting() -> anyhow::Result<()> {
    let mut document = document(FIRST_PERSON);
    assert!(SceneReader::attach_mesh_data(
        &mut document,
        AssetId(100),
        skinned_triangles(&[0, 1, 2], 3)
    ));
    // a second, static renderer drawing the same mesh must keep seeing all of it
    let body = document
        .root
        .children
        .iter_mut()
        .find(|child| child.name == "Body")
        .expect("body node");
    body.components.push(Component::new(
        ObjectId(61),
        ComponentPayload::MeshRenderer(MeshRendererData {
            mesh: AssetId(100),
            materials: vec![],
        }),
    ));

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document, |_| {}).await?;
    let world = engine.world();

    let original = avatar.registry.get(AssetId(100)).expect("mesh is registered");
    let skinned = avatar.registry.get(ObjectId(60)).expect("skinned renderer");
    let rigid = avatar.registry.get(ObjectId(61)).expect("static renderer");

    assert_eq!(world.get::<&MeshRenderer>(rigid)?.mesh, Some(original));
    assert_eq!(world.get::<&MeshAsset>(original)?.mesh.submeshes.len(), 1);

    let duplicate = world
        .get::<&SkinnedMeshRenderer>(skinned)?
        .mesh
        .expect("skinned renderer keeps a mesh");
    assert_ne!(duplicate, original);
    assert_eq!(world.get::<&AssetName>(duplicate)?.0, "Body_FirstPerson");
    assert_eq!(world.get::<&MeshAsset>(duplicate)?.mesh.submeshes.len(), 2);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn unknown_types_are_skipped_and_reported() -> anyhow::Result<()> {
    let json = r#"{
        "root": {
            "id": 1,
            "name": "Avatar",
            "components": [ { "type": "VRCStation", "id": 12, "seated": true } ]
        },
        "assets": [ { "id": 103, "name": "Wobble", "type": "AnimationClip" } ]
    }"#;

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document(json), |_| {}).await?;

    assert_eq!(avatar.report.skipped_types.get("VRCStation"), Some(&1));
    assert_eq!(avatar.report.skipped_types.get("AnimationClip"), Some(&1));
    assert!(!avatar.registry.contains(ObjectId(12)));
    assert!(avatar.registry.resolve_weak::<Slot, _>(engine.world(), ObjectId(12)).is_none());
    assert!(matches!(
        avatar.registry.resolve::<Slot, _>(engine.world(), ObjectId(12)),
        Err(ConversionError::UnresolvedReference { .. })
    ));
    assert!(engine.attached(avatar.root).is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn assets_with_one_stable_id_are_built_once() -> anyhow::Result<()> {
    let json = r#"{
        "root": { "id": 1, "name": "Avatar" },
        "assets": [
            { "id": 20, "name": "Skin", "type": "Material", "stable_id": "aaaa1111bbbb", "main_texture": 30 },
            { "id": 21, "name": "Skin (copy)", "type": "Material", "stable_id": "aaaa1111bbbb" },
            { "id": 22, "name": "Skin", "type": "Material", "stable_id": "cccc2222dddd" },
            { "id": 30, "name": "Skin_albedo", "type": "Texture", "width": 4, "height": 4 }
        ]
    }"#;

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document(json), |_| {}).await?;
    let world = engine.world();

    let first = avatar.registry.get(AssetId(20)).expect("material");
    assert_eq!(avatar.registry.get(AssetId(21)), Some(first));
    assert_eq!(avatar.report.deduplicated_assets, 1);
    assert_eq!(avatar.report.assets, 3);

    let other = avatar.registry.get(AssetId(22)).expect("material");
    assert_eq!(world.get::<&AssetName>(first)?.0, "Skin");
    assert_eq!(world.get::<&AssetName>(other)?.0, "Skin_cccc2222");

    // declared after the material that uses it
    let texture = avatar.registry.get(AssetId(30)).expect("texture");
    assert_eq!(world.get::<&MaterialAsset>(first)?.main_texture, Some(texture));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn packaged_asset_names_never_collide() -> anyhow::Result<()> {
    let json = r#"{
        "root": { "id": 1, "name": "Avatar" },
        "assets": [
            { "id": 20, "name": "Skin", "type": "Material" },
            { "id": 21, "name": "Skin", "type": "Material", "stable_id": "cccc2222dddd" },
            { "id": 22, "name": "Skin", "type": "Material", "stable_id": "cccc2222eeee" },
            { "id": 23, "name": "Skin", "type": "Material" }
        ]
    }"#;

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document(json), |_| {}).await?;

    let graph = PackagedGraph::capture(&engine, avatar.root);
    let names = graph.assets.iter().map(|asset| asset.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Skin", "Skin_cccc2222", "Skin_cccc2222_1", "Skin_1"]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn dynamic_bone_chain_resolves_forward_references() -> anyhow::Result<()> {
    let json = r#"{
        "root": {
            "id": 1,
            "name": "Avatar",
            "components": [
                { "type": "DynamicBoneChain", "id": 10, "root": 2, "exclusions": [4], "colliders": [30, 31] }
            ],
            "children": [
                {
                    "id": 2,
                    "name": "Tail",
                    "children": [
                        {
                            "id": 3,
                            "name": "Tail1",
                            "children": [ { "id": 4, "name": "Tail2", "children": [ { "id": 5, "name": "Tail3" } ] } ]
                        }
                    ]
                },
                {
                    "id": 6,
                    "name": "Hips",
                    "components": [ { "type": "DynamicBoneCollider", "id": 30, "shape": "Capsule", "radius": 0.1 } ]
                }
            ]
        }
    }"#;

    let mut engine = Engine::default();
    let avatar = converter().convert(&mut engine, &document(json), |_| {}).await?;
    let world = engine.world();
    let object = |id| avatar.registry.get(ObjectId(id)).expect("registered");

    let chain = world.get::<&DynamicBoneChain>(object(10))?;
    assert_eq!(chain.root, Some(object(2)));
    assert_eq!(chain.bones, vec![object(2), object(3)]);
    assert_eq!(chain.colliders, vec![object(30)]);
    assert!(world.get::<&DynamicBoneCollider>(object(30)).is_ok());
    assert!(avatar.report.warnings.iter().any(|warning| warning.contains("object#31")));
    Ok(())
}
