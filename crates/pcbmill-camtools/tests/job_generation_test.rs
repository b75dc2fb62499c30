use pcbmill_camtools::{GenerationContext, JobOrchestrator, JobRequest};
use pcbmill_core::{
    CancellationToken, FailKind, GeometryObject, MoveKind, OffsetType, ParamSet, Polygon,
    ToolId, ToolRecord, ToolShape,
};

fn board() -> GeometryObject {
    GeometryObject::new("board", vec![Polygon::rectangle(0.0, 0.0, 10.0, 5.0)])
}

fn run(object: &GeometryObject) -> Result<pcbmill_core::Job, FailKind> {
    let ctx = GenerationContext::default();
    let cancel = CancellationToken::new();
    let request = JobRequest::snapshot(object, "board_cnc", None, 0.0, 0.0, false)?;
    JobOrchestrator::new(&ctx, &cancel).run(&request)
}

#[test]
fn test_single_c1_tool_end_to_end() {
    let mut object = board();
    object
        .tools
        .insert(ToolRecord::new(
            1,
            0.2,
            ParamSet {
                tool_shape: ToolShape::C1,
                offset_type: OffsetType::Path,
                ..ParamSet::default()
            },
        ))
        .unwrap();

    let job = run(&object).unwrap();
    let ring_vertices = 4;
    assert_eq!(job.move_count(), ring_vertices + 4);

    let moves = &job.tools[0].parsed_moves;
    assert_eq!(moves[0].kind, MoveKind::Rapid);
    assert_eq!(moves[0].z, 2.0);
    let cuts: Vec<_> = moves
        .iter()
        .filter(|m| m.kind == MoveKind::Linear && m.feed == Some(120.0))
        .collect();
    assert_eq!(cuts.len(), ring_vertices);
    assert!(cuts.iter().all(|m| m.z == -0.1));
    assert_eq!(moves.last().unwrap().z, 15.0);
}

#[test]
fn test_table_order_drives_emission() {
    let mut object = board();
    for id in [3, 1, 2] {
        object
            .tools
            .insert(ToolRecord::new(
                id,
                0.1 * id as f64,
                ParamSet {
                    toolchange: true,
                    ..ParamSet::default()
                },
            ))
            .unwrap();
    }

    let job = run(&object).unwrap();
    assert_eq!(job.tool_ids(), vec![ToolId(3), ToolId(1), ToolId(2)]);
    assert!(job.start_gcode.contains("T3"));
    assert!(!job.start_gcode.contains("T1"));

    let positions: Vec<usize> = ["; T3:", "; T1:", "; T2:"]
        .iter()
        .map(|marker| job.source_text.find(marker).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    // Only the first tool gets a toolchange block without retrigger
    assert_eq!(job.source_text.matches("M6").count(), 1);
}

#[test]
fn test_retrigger_toolchange_for_every_tool() {
    let mut object = board();
    for id in [1, 2] {
        object
            .tools
            .insert(ToolRecord::new(
                id,
                0.2,
                ParamSet {
                    toolchange: true,
                    ..ParamSet::default()
                },
            ))
            .unwrap();
    }
    let ctx = GenerationContext::default();
    let cancel = CancellationToken::new();
    let request = JobRequest::snapshot(&object, "job", None, 0.0, 0.0, true).unwrap();
    let job = JobOrchestrator::new(&ctx, &cancel).run(&request).unwrap();
    assert_eq!(job.source_text.matches("M6").count(), 2);
}

#[test]
fn test_regeneration_is_byte_identical() {
    let mut object = board();
    object
        .tools
        .insert(ToolRecord::new(
            1,
            0.3,
            ParamSet {
                offset_type: OffsetType::Out,
                multidepth: true,
                cut_z: -0.35,
                extracut: true,
                ..ParamSet::default()
            },
        ))
        .unwrap();

    let first = run(&object).unwrap();
    let second = run(&object).unwrap();
    assert_eq!(first.source_text, second.source_text);
    assert_eq!(first, second);
}

#[test]
fn test_failing_tool_aborts_whole_job() {
    let mut object = board();
    object
        .tools
        .insert(ToolRecord::new(1, 0.2, ParamSet::default()))
        .unwrap();
    object
        .tools
        .insert(ToolRecord::new(
            2,
            0.2,
            ParamSet {
                offset_type: OffsetType::Custom,
                offset_value: None,
                ..ParamSet::default()
            },
        ))
        .unwrap();

    assert_eq!(
        run(&object).unwrap_err(),
        FailKind::MissingOffsetValue { tool_id: 2 }
    );
}

#[test]
fn test_multigeo_tools_cut_their_own_geometry() {
    let mut object = board();
    object.multigeo = true;
    let mut record = ToolRecord::new(1, 0.2, ParamSet::default());
    record.owned_geometry = vec![Polygon::rectangle(20.0, 20.0, 1.0, 1.0)];
    object.tools.insert(record).unwrap();

    let job = run(&object).unwrap();
    let cut = &job.tools[0].geometry[0];
    assert!(cut.points.iter().all(|p| p.x >= 20.0));
}
