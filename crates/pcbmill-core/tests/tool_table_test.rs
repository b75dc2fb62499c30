use pcbmill_core::data::tools_db::{ToolDbRecord, ToolTarget, ToolsDatabase};
use pcbmill_core::{
    FailKind, GeometryObject, JobType, OffsetType, ParamSet, Polygon, ToolId, ToolRecord,
    ToolTable,
};
use proptest::prelude::*;

#[test]
fn test_tool_table_serde_keeps_order() {
    let mut table = ToolTable::new();
    for id in [5, 2, 9] {
        table
            .insert(ToolRecord::new(id, 0.2, ParamSet::default()))
            .unwrap();
    }

    let json = serde_json::to_string(&table).unwrap();
    let back: ToolTable = serde_json::from_str(&json).unwrap();
    assert_eq!(back.ids(), vec![ToolId(5), ToolId(2), ToolId(9)]);
    assert_eq!(back, table);
}

#[test]
fn test_tool_table_json_rejects_bad_ids() {
    let duplicate = r#"[
        {"tool_id": 1, "diameter": 0.2},
        {"tool_id": 1, "diameter": 0.5}
    ]"#;
    let err = serde_json::from_str::<ToolTable>(duplicate).unwrap_err();
    assert!(err.to_string().contains("Tool 1 already exists"), "{}", err);

    let zero = r#"[{"tool_id": 0, "diameter": 0.2}]"#;
    assert!(serde_json::from_str::<ToolTable>(zero).is_err());

    let object = r#"{
        "name": "board",
        "tools": [
            {"tool_id": 4, "diameter": 0.2},
            {"tool_id": 4, "diameter": 0.2}
        ]
    }"#;
    assert!(serde_json::from_str::<GeometryObject>(object).is_err());
}

#[test]
fn test_geometry_object_from_json() {
    let json = r#"{
        "name": "board",
        "tools": [
            {"tool_id": 1, "diameter": 0.2, "params": {"job_type": "isolation"}},
            {"tool_id": 2, "diameter": 1.0, "params": {"job_type": "polish", "offset_type": "in"}}
        ],
        "solid_geometry": [
            {"exterior": [{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 0.0}, {"x": 10.0, "y": 5.0}]}
        ]
    }"#;

    let obj: GeometryObject = serde_json::from_str(json).unwrap();
    assert!(!obj.multigeo);
    assert_eq!(obj.tools.len(), 2);
    let polish = obj.tools.get(ToolId(2)).unwrap();
    assert_eq!(polish.params.job_type, JobType::Polish);
    assert_eq!(polish.params.offset_type, OffsetType::In);
    assert_eq!(obj.solid_geometry[0].area(), 25.0);
}

#[test]
fn test_tools_db_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tools_db.json");

    let mut db = ToolsDatabase::new();
    db.add(ToolDbRecord {
        name: "0.8mm drill mill".to_string(),
        diameter: 0.8,
        tolerance: 0.05,
        tool_target: ToolTarget::Drilling,
        params: ParamSet {
            cut_z: -1.7,
            multidepth: true,
            depth_per_pass: 0.6,
            ..ParamSet::default()
        },
    });
    db.save_to_file(&path).unwrap();

    let loaded = ToolsDatabase::load_from_file(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    let params = loaded.lookup(0.82, ToolTarget::Drilling).unwrap().unwrap();
    assert_eq!(params.depth_per_pass, 0.6);
    assert!(loaded.lookup(0.82, ToolTarget::Milling).unwrap().is_none());
}

#[test]
fn test_remove_keeps_remaining_order() {
    let mut table = ToolTable::new();
    for id in [1, 2, 3] {
        table
            .insert(ToolRecord::new(id, 1.0, ParamSet::default()))
            .unwrap();
    }
    let removed = table.remove(ToolId(2)).unwrap();
    assert_eq!(removed.tool_id, ToolId(2));
    assert_eq!(table.ids(), vec![ToolId(1), ToolId(3)]);
    assert_eq!(
        table.require(ToolId(2)).unwrap_err(),
        FailKind::ToolNotFound { tool_id: 2 }
    );
}

#[test]
fn test_single_geo_shares_geometry() {
    let mut obj = GeometryObject::new("board", vec![Polygon::rectangle(0.0, 0.0, 2.0, 2.0)]);
    obj.tools
        .insert(ToolRecord::new(1, 0.5, ParamSet::default()))
        .unwrap();
    assert_eq!(obj.geometry_for(ToolId(1)).len(), 1);
    assert!(obj.geometry_for(ToolId(7)).len() == 1);

    obj.multigeo = true;
    assert!(obj.geometry_for(ToolId(1)).is_empty());
}

proptest! {
    #[test]
    fn prop_insertion_order_is_emission_order(ids in proptest::collection::hash_set(1u32..500, 1..20)) {
        let ids: Vec<u32> = ids.into_iter().collect();
        let mut table = ToolTable::new();
        for id in &ids {
            table.insert(ToolRecord::new(*id, 1.0, ParamSet::default())).unwrap();
        }
        let got: Vec<u32> = table.ids().into_iter().map(|id| id.0).collect();
        prop_assert_eq!(got, ids.clone());
        prop_assert_eq!(table.next_id().0, ids.iter().max().unwrap() + 1);
    }
}
