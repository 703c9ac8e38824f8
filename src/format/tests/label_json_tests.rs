//! Tests for single labels and label arrays.

use imlabel_raster::Vertex;
use serde_json::{Value, json};

use crate::error::LabelError;
use crate::model::{Label, LabelCollection, LabelId, LabelShape, ObjectTable};

fn outer_js() -> Value {
    json!([{"x": 10.0, "y": 10.0}, {"x": 40.0, "y": 10.0}, {"x": 40.0, "y": 40.0}, {"x": 10.0, "y": 40.0}])
}

fn inner_js() -> Value {
    json!([{"x": 20.0, "y": 20.0}, {"x": 30.0, "y": 20.0}, {"x": 30.0, "y": 30.0}, {"x": 20.0, "y": 30.0}])
}

fn rect(lo: f64, hi: f64) -> Vec<Vertex> {
    vec![
        Vertex::new(lo, lo),
        Vertex::new(hi, lo),
        Vertex::new(hi, hi),
        Vertex::new(lo, hi),
    ]
}

/// Labels of every variant with all common fields set.
fn all_variants() -> Vec<Label> {
    vec![
        Label::point(Vertex::new(1.0, 2.0)),
        Label::polygon(vec![rect(10.0, 40.0), rect(20.0, 30.0)]),
        Label::bbox(Vertex::new(15.0, 25.0), Vertex::new(8.0, 12.0)),
        Label::oriented_ellipse(Vertex::new(15.0, 25.0), 10.0, 3.0, 30f64.to_radians()),
        Label::composite(vec![LabelId::new("abc__1"), LabelId::new("abc__2")]),
        Label::group(vec![
            Label::point(Vertex::new(3.0, 4.0)).with_id("abc__8"),
            Label::bbox(Vertex::new(1.0, 1.0), Vertex::new(2.0, 2.0)),
        ]),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, l)| {
        l.with_id(format!("abc__{}", i + 10).as_str())
            .with_class("cls_a")
            .with_source("manual")
            .with_metadata("purpose", "test")
    })
    .collect()
}

#[test]
fn test_point_to_json() {
    let b = Label::point(Vertex::new(1.0, 2.0))
        .with_id("abc_123")
        .with_class("cls_a")
        .with_source("manual")
        .with_metadata("purpose", "test");
    assert_eq!(
        b.to_json().unwrap(),
        json!({
            "label_type": "point",
            "position": {"x": 1.0, "y": 2.0},
            "object_id": "abc_123",
            "label_class": "cls_a",
            "source": "manual",
            "anno_data": {"purpose": "test"}
        })
    );
}

#[test]
fn test_unset_fields_written_as_null() {
    let a = Label::point(Vertex::new(-1.0, 1.0));
    let js = a.to_json().unwrap();
    assert_eq!(js["object_id"], Value::Null);
    assert_eq!(js["label_class"], Value::Null);
    assert_eq!(js["source"], Value::Null);
    assert_eq!(js["anno_data"], json!({}));
}

#[test]
fn test_polygon_to_json() {
    let b = Label::polygon(vec![rect(10.0, 40.0), rect(20.0, 30.0)])
        .with_id("abc_123")
        .with_class("cls_a");
    let js = b.to_json().unwrap();
    assert_eq!(js["label_type"], "polygon");
    assert_eq!(js["regions"], json!([outer_js(), inner_js()]));
    assert!(js.get("vertices").is_none());
}

#[test]
fn test_box_and_ellipse_to_json() {
    let a = Label::bbox(Vertex::new(15.0, 25.0), Vertex::new(8.0, 12.0));
    let js = a.to_json().unwrap();
    assert_eq!(js["centre"], json!({"x": 15.0, "y": 25.0}));
    assert_eq!(js["size"], json!({"x": 8.0, "y": 12.0}));

    let e = Label::oriented_ellipse(Vertex::new(15.0, 25.0), 10.0, 3.0, 30f64.to_radians());
    let js = e.to_json().unwrap();
    assert_eq!(js["label_type"], "oriented_ellipse");
    assert_eq!(js["radius1"], json!(10.0));
    assert_eq!(js["radius2"], json!(3.0));
    assert_eq!(js["orientation_radians"], json!(30f64.to_radians()));
}

#[test]
fn test_composite_and_group_to_json() {
    let c = Label::composite(vec![LabelId::new("abc__1"), LabelId::new("abc__2")]);
    assert_eq!(c.to_json().unwrap()["components"], json!(["abc__1", "abc__2"]));

    let g = Label::group(vec![Label::point(Vertex::new(1.0, 1.0)).with_id("abc__3")]);
    let js = g.to_json().unwrap();
    assert_eq!(js["label_type"], "group");
    assert_eq!(js["component_models"][0]["label_type"], "point");
    assert_eq!(js["component_models"][0]["object_id"], "abc__3");
}

#[test]
fn test_round_trip_every_variant() {
    let mut table = ObjectTable::with_prefix("rt");
    for label in all_variants() {
        let js = label.to_json().unwrap();
        let back = Label::from_json(&js, &mut table).unwrap();
        assert_eq!(back, label, "{}", label.label_type());
    }
}

#[test]
fn test_from_json_point() {
    let mut table = ObjectTable::with_prefix("abc");
    let js = json!({
        "label_type": "point",
        "position": {"x": 1.0, "y": 2.0},
        "object_id": "abc_123",
        "label_class": "cls_a",
        "source": "manual",
        "anno_data": {"purpose": "test"}
    });
    let b = Label::from_json(&js, &mut table).unwrap();
    assert_eq!(b.shape, LabelShape::Point { position: Vertex::new(1.0, 2.0) });
    assert_eq!(b.id, Some(LabelId::new("abc_123")));
    assert_eq!(b.classification.as_deref(), Some("cls_a"));
    assert_eq!(b.source.as_deref(), Some("manual"));
    assert_eq!(b.metadata.get("purpose"), Some(&json!("test")));
}

#[test]
fn test_from_json_minimal_fields() {
    let mut table = ObjectTable::with_prefix("abc");
    let js = json!({"label_type": "box", "centre": {"x": 10, "y": 10}, "size": {"x": 4, "y": 6}, "anno_data": null});
    let b = Label::from_json(&js, &mut table).unwrap();
    assert!(b.id.is_none() && b.classification.is_none() && b.source.is_none());
    assert!(b.metadata.is_empty());
    assert_eq!(
        b.shape,
        LabelShape::Box {
            centre: Vertex::new(10.0, 10.0),
            size: Vertex::new(4.0, 6.0)
        }
    );
}

#[test]
fn test_legacy_polygon_vertices() {
    let mut table = ObjectTable::with_prefix("abc");
    let js = json!({"label_type": "polygon", "vertices": inner_js(), "label_class": "cls_a"});
    let p = Label::from_json(&js, &mut table).unwrap();
    assert_eq!(p.shape, LabelShape::Polygon { regions: vec![rect(20.0, 30.0)] });
    // written back in the current layout
    assert_eq!(p.to_json().unwrap()["regions"], json!([inner_js()]));
}

#[test]
fn test_legacy_integer_ids() {
    let mut table = ObjectTable::with_prefix("pqr");
    let js = json!({"label_type": "composite", "object_id": 12, "components": [3, "pqr__5"]});
    let c = Label::from_json(&js, &mut table).unwrap();
    assert_eq!(c.id, Some(LabelId::new("pqr__12")));
    assert_eq!(c.dependencies(), &[LabelId::new("pqr__3"), LabelId::new("pqr__5")]);
    assert_eq!(table.next_index(), 13);
}

#[test]
fn test_unknown_label_type() {
    let mut table = ObjectTable::new();
    let err = Label::from_json(&json!({"label_type": "blob"}), &mut table).unwrap_err();
    assert!(matches!(err, LabelError::UnknownLabelType { ref label_type } if label_type == "blob"));

    let nested = json!({
        "label_type": "group",
        "component_models": [{"label_type": "point", "position": {"x": 0, "y": 0}}, {"label_type": "spline"}]
    });
    let err = Label::from_json(&nested, &mut table).unwrap_err();
    assert!(matches!(err, LabelError::UnknownLabelType { ref label_type } if label_type == "spline"));
}

#[test]
fn test_malformed_labels() {
    let mut table = ObjectTable::new();
    for js in [
        json!({"position": {"x": 1, "y": 2}}),
        json!({"label_type": 3}),
        json!({"label_type": "point"}),
        json!({"label_type": "point", "position": {"x": "a", "y": 2}}),
        json!({"label_type": "polygon"}),
        json!({"label_type": "oriented_ellipse", "centre": {"x": 1, "y": 2}, "radius1": 1.0}),
        json!("point"),
    ] {
        let err = Label::from_json(&js, &mut table).unwrap_err();
        assert!(matches!(err, LabelError::MalformedJson { .. }), "{js}: {err}");
    }
}

#[test]
fn test_collection_round_trip() {
    let labels = LabelCollection::from_labels(vec![
        Label::point(Vertex::new(1.0, 2.0)).with_id("abc__1"),
        Label::group(vec![Label::point(Vertex::new(2.0, 2.0)).with_id("abc__2")]).with_id("abc__3"),
        Label::composite(vec![LabelId::new("abc__1"), LabelId::new("abc__2")]).with_id("abc__4"),
    ])
    .unwrap();
    let js = labels.to_json().unwrap();
    assert_eq!(js.as_array().unwrap().len(), 3);
    let back = LabelCollection::from_json(&js).unwrap();
    assert_eq!(back.labels(), labels.labels());
    assert_eq!(back.table().len(), 4);
    assert_ne!(back.table().prefix(), labels.table().prefix());
}

#[test]
fn test_collection_assigns_missing_ids() {
    let js = json!([
        {"label_type": "point", "position": {"x": 1, "y": 1}},
        {"label_type": "point", "position": {"x": 2, "y": 2}, "object_id": 7}
    ]);
    let labels = LabelCollection::from_json(&js).unwrap();
    let prefix = labels.table().prefix().to_string();
    assert_eq!(labels.labels()[0].id, Some(LabelId::new(format!("{prefix}__8"))));
    assert_eq!(labels.labels()[1].id, Some(LabelId::new(format!("{prefix}__7"))));
}

#[test]
fn test_collection_drops_dangling_components() {
    let js = json!([
        {"label_type": "point", "position": {"x": 1, "y": 1}, "object_id": "a__1"},
        {"label_type": "composite", "components": ["a__1", "a__99"]}
    ]);
    let labels = LabelCollection::from_json(&js).unwrap();
    assert_eq!(labels.labels()[1].dependencies(), &[LabelId::new("a__1")]);
}

#[test]
fn test_collection_duplicate_ids() {
    let js = json!([
        {"label_type": "point", "position": {"x": 1, "y": 1}, "object_id": "a__1"},
        {"label_type": "point", "position": {"x": 2, "y": 2}, "object_id": "a__1"}
    ]);
    let err = LabelCollection::from_json(&js).unwrap_err();
    assert!(matches!(err, LabelError::DuplicateId { .. }));
}

#[test]
fn test_collection_requires_array() {
    let err = LabelCollection::from_json(&json!({"labels": []})).unwrap_err();
    assert!(matches!(err, LabelError::MalformedJson { .. }));
}
