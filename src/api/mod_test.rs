use super::*;

#[test]
fn error_codes_are_stable() {
    assert_eq!(ApiError::Unauthorized.error_code(), "E_UNAUTHORIZED");
    assert_eq!(ApiError::NotFound("board".into()).error_code(), "E_NOT_FOUND");
    assert_eq!(ApiError::Decode("x".into()).error_code(), "E_API_DECODE");
}

#[test]
fn retryable_covers_transport_and_server_errors() {
    assert!(ApiError::Transport("reset".into()).retryable());
    assert!(ApiError::Status { status: 503, body: String::new() }.retryable());
    assert!(ApiError::Status { status: 429, body: String::new() }.retryable());
    assert!(!ApiError::Status { status: 400, body: String::new() }.retryable());
    assert!(!ApiError::Unauthorized.retryable());
}

#[test]
fn board_document_tolerates_missing_optional_fields() {
    let id = uuid::Uuid::new_v4();
    let json = serde_json::json!({ "id": id, "name": "Costs" });
    let doc: BoardDocument = serde_json::from_value(json).unwrap();
    assert_eq!(doc.id, id);
    assert!(!doc.read_only);
    assert!(doc.groups.is_empty() && doc.placements.is_empty() && doc.annotations.is_empty());
    assert!(doc.viewport.is_none());
}

#[test]
fn group_record_reads_flat_geometry() {
    let id = uuid::Uuid::new_v4();
    let json = serde_json::json!({
        "id": id, "name": "Acme", "color": "#f00",
        "x": 10.0, "y": 20.0, "width": 300.0, "height": 200.0
    });
    let record: GroupRecord = serde_json::from_value(json).unwrap();
    assert_eq!(record.rect, Rect::new(10.0, 20.0, 300.0, 200.0));
}

#[test]
fn group_draft_writes_flat_geometry() {
    let draft = GroupDraft { name: "Acme".into(), color: "#f00".into(), rect: Rect::new(1.0, 2.0, 3.0, 4.0) };
    let json = serde_json::to_value(&draft).unwrap();
    assert_eq!(json["x"], 1.0);
    assert_eq!(json["height"], 4.0);
    assert!(json.get("rect").is_none());
}

#[test]
fn placement_record_parses_resource_and_group() {
    let (pid, gid) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
    let json = serde_json::json!({
        "id": pid,
        "resource": { "id": "arn:vm-1", "name": "vm-1" },
        "position": { "x": 5.0, "y": 6.0 },
        "group_id": gid
    });
    let record: PlacementRecord = serde_json::from_value(json).unwrap();
    assert_eq!(record.resource.id, ResourceId::new("arn:vm-1"));
    assert_eq!(record.position, Point::new(5.0, 6.0));
    assert_eq!(record.group_id, Some(gid));
}
