//! Schemas declared in JSON, driving export and import without record types

use pretty_assertions::assert_eq;
use sheetwise::prelude::*;
use sheetwise::{build_workbook, dataset_from_json, CellValue, SchemaDefinition};

const SCHEMA: &str = include_str!("../../../demos/staff.schema.json");
const DATA: &str = include_str!("../../../demos/staff.data.json");

fn export(definition: &SchemaDefinition) -> sheetwise::Workbook {
    let options = EngineOptions::default();
    let schemas = definition.schemas().unwrap();
    let data: serde_json::Value = serde_json::from_str(DATA).unwrap();
    let rows = dataset_from_json(&schemas, &data, &options).unwrap();
    let sheets: Vec<SheetData<'_>> = schemas
        .iter()
        .zip(&rows)
        .map(|(schema, records)| SheetData::with_schema(schema, records))
        .collect();
    build_workbook(&sheets, options).unwrap()
}

#[test]
fn test_definition_export_layout() {
    let definition = SchemaDefinition::from_json(SCHEMA).unwrap();
    let workbook = export(&definition);

    assert_eq!(workbook.sheet_count(), 2);
    let people = workbook.worksheet(0).unwrap();
    assert_eq!(people.name(), "人员");
    assert_eq!(people.get_value_at(0, 2), CellValue::string("入职日期"));
    assert_eq!(people.get_value_at(1, 2), CellValue::string("2021/04/01"));
    assert_eq!(people.get_value_at(2, 1), CellValue::Number(130.0));

    let positions = workbook.worksheet(1).unwrap();
    assert_eq!(positions.name(), "岗位");
    assert_eq!(positions.get_value_at(1, 2), CellValue::string("在职"));
    assert_eq!(positions.get_value_at(2, 2), CellValue::string("离职"));
    assert_eq!(positions.comment_at(0, 0).unwrap().text, "每个员工只能出现一次");
    assert_eq!(positions.data_validations()[0].items, vec!["在职", "离职"]);
}

#[test]
fn test_definition_import_partitions() {
    let definition = SchemaDefinition::from_json(SCHEMA).unwrap();
    let workbook = export(&definition);

    let mut registry = HandlerRegistry::new();
    let sheets = definition.register_all(&mut registry).unwrap();
    assert_eq!(sheets.len(), 2);

    let outcome = Importer::new(&registry).import(&workbook, &sheets).unwrap();
    let people = outcome.result.sheet_named("人员").unwrap();
    assert_eq!((people.valid_count(), people.invalid_count()), (1, 2));
    let positions = outcome.result.sheet_named("岗位").unwrap();
    assert_eq!((positions.valid_count(), positions.invalid_count()), (1, 3));

    let valid = positions.valid::<DynamicRecord>().unwrap();
    assert_eq!(valid[0].value("staff_code"), FieldValue::from("002"));
    assert_eq!(valid[0].value("state"), FieldValue::Code("2".into()));

    let report = outcome.error_report.unwrap();
    let people_report = report.workbook().worksheet(0).unwrap();
    assert_eq!(people_report.comment_at(1, 1).unwrap().text, "年龄必须在16到100之间");
    assert_eq!(people_report.comment_at(2, 0).unwrap().text, "must not be blank");

    let positions_report = report.workbook().worksheet(1).unwrap();
    assert_eq!(positions_report.comment_at(1, 0).unwrap().text, "duplicate value '001'");
    assert_eq!(positions_report.comment_at(3, 0).unwrap().text, "must match ^[0-9]{3}$");
}

#[test]
fn test_invalid_pattern_is_a_configuration_error() {
    let definition = SchemaDefinition::from_json(
        r#"{ "sheets": [ { "name": "codes", "columns": [
            { "field": "code", "header": "Code", "index": 0, "rules": { "pattern": "([" } }
        ] } ] }"#,
    )
    .unwrap();
    let err = definition.schemas().unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}

#[test]
fn test_option_label_with_comma_is_a_configuration_error() {
    let definition = SchemaDefinition::from_json(
        r#"{ "sheets": [ { "name": "jobs", "columns": [
            { "field": "state", "header": "State", "index": 0, "kind": "coded",
              "options": [
                { "code": "1", "label": "Running" },
                { "code": "2", "label": "Paused, waiting" }
              ] }
        ] } ] }"#,
    )
    .unwrap();
    let err = definition.schemas().unwrap_err();
    assert!(matches!(err, Error::Configuration { ref message, .. } if message.contains("comma")));
}
