use super::*;
use crate::tables::{car_schema, dealer_schema};
use qcert_core::{DataType, record};
use rstest::rstest;

fn ford() -> Record {
    record! { "Make" => "Ford", "Model" => "Focus", "Year" => 2008, "Mileage" => 74999 }
}

mod record_equality {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extra_actual_fields_are_ignored() {
        let stored = ford().with("Id", 1).with("DateCreated", Value::Null);
        assert!(records_equal(&ford(), &stored, &[]));
        assert!(!records_equal(&stored, &ford(), &[]));
    }

    #[test]
    fn test_empty_expected_is_trivially_equal() {
        assert!(records_equal(&Record::new(), &ford(), &[]));
        assert!(records_equal(&Record::new(), &Record::new(), &[]));
    }

    #[rstest]
    #[case::different_value(record! { "Year" => 2009 })]
    #[case::different_type(record! { "Year" => "2008" })]
    #[case::null_vs_value(record! { "Year" => Value::Null })]
    fn test_value_mismatch_fails(#[case] patch: Record) {
        let mut actual = ford();
        actual.merge(&patch);
        assert!(!records_equal(&ford(), &actual, &[]));
        assert!(first_difference(&ford(), &actual, &[]).is_some_and(|d| d.contains("Year")));
    }

    #[test]
    fn test_ignored_keys_are_skipped() {
        let actual = ford().with("Year", 1999);
        assert!(records_equal(&ford(), &actual, &["Year"]));
        assert_eq!(first_difference(&ford(), &actual, &["Year"]), None);
    }

    #[test]
    fn test_widened_numbers_are_equal() {
        let actual = ford().with("Mileage", 74999.0);
        assert!(records_equal(&ford(), &actual, &[]));
        assert!(!values_equal(&Value::Int(1), &Value::Float(1.5)));
    }

    #[test]
    fn test_missing_field_is_reported() {
        let mut actual = ford();
        actual.remove("Model");
        assert_eq!(
            first_difference(&ford(), &actual, &[]),
            Some("field 'Model' missing, expected \"Focus\"".to_string())
        );
    }
}

mod generated_fields {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reports_absent_and_null_generated_fields() {
        let schema = car_schema("Car");
        assert_eq!(
            missing_generated_fields(&schema, &ford()),
            vec!["Id".to_string(), "DateCreated".to_string()]
        );

        let stored = ford().with("Id", 1).with("DateCreated", Value::Null);
        assert_eq!(missing_generated_fields(&schema, &stored), vec!["DateCreated".to_string()]);
    }
}

mod row_sets {
    use super::*;

    #[test]
    fn test_same_members_ignores_order() {
        let a = vec![ford().with("Id", 1), ford().with("Id", 2).with("Year", 2010)];
        let b = vec![a[1].clone(), a[0].clone()];
        assert!(same_members(&a, &b, &["Id"]));
    }

    #[test]
    fn test_same_members_detects_differences() {
        let a = vec![ford().with("Id", 1), ford().with("Id", 2)];
        assert!(!same_members(&a, &a[..1], &["Id"]));

        let changed = vec![a[0].clone(), a[1].clone().with("Year", 2020)];
        assert!(!same_members(&a, &changed, &["Id"]));

        let rekeyed = vec![a[0].clone(), a[1].clone().with("Id", 3)];
        assert!(!same_members(&a, &rekeyed, &["Id"]));
    }

    #[test]
    fn test_duplicate_keys_must_match_one_to_one() {
        let a = vec![ford().with("Id", 1), ford().with("Id", 2)];
        let b = vec![ford().with("Id", 1), ford().with("Id", 1)];
        assert!(!same_members(&a, &b, &["Id"]));
    }
}

mod schema_equality {
    use super::*;
    use pretty_assertions::assert_eq;
    use qcert_core::{DefaultValue, FieldDescriptor};

    #[test]
    fn test_identical_schemas_are_equal() {
        assert!(schema_equal(&car_schema("Car"), &car_schema("Car")));
        assert!(schema_diff(&dealer_schema("Dealer"), &dealer_schema("Dealer")).is_empty());
    }

    #[test]
    fn test_declaration_order_is_irrelevant() {
        let mut fields: Vec<FieldDescriptor> = car_schema("Car").iter().cloned().collect();
        fields.reverse();
        let reversed = fields.into_iter().fold(Schema::new(), Schema::with);
        assert!(schema_equal(&car_schema("Car"), &reversed));
    }

    #[test]
    fn test_extra_actual_fields_are_allowed() {
        let wider = dealer_schema("Dealer")
            .with(FieldDescriptor::new("Dealer", "City", DataType::varchar(40)).nullable());
        assert!(schema_equal(&dealer_schema("Dealer"), &wider));
        assert!(!schema_equal(&wider, &dealer_schema("Dealer")));
    }

    #[test]
    fn test_every_mismatch_is_listed() {
        let actual = Schema::new()
            .with(FieldDescriptor::new("Dealer", "Id", DataType::varchar(36)).primary().nullable());
        let diff = schema_diff(&dealer_schema("Dealer"), &actual);

        assert_eq!(
            diff,
            vec![
                SchemaMismatch::Attribute {
                    field: "Id".into(),
                    attribute: "is_nullable",
                    expected: "false".into(),
                    actual: "true".into(),
                },
                SchemaMismatch::Attribute {
                    field: "Id".into(),
                    attribute: "datatype",
                    expected: DataType::varchar(32).to_string(),
                    actual: DataType::varchar(36).to_string(),
                },
                SchemaMismatch::MissingField("Name".into()),
            ]
        );
        assert_eq!(diff[2].to_string(), "field 'Name' is missing");
    }

    #[rstest]
    #[case::same_token(DefaultValue::Token { len: 32 }, DefaultValue::Token { len: 32 }, true)]
    #[case::token_length(DefaultValue::Token { len: 32 }, DefaultValue::Token { len: 16 }, false)]
    #[case::same_constant(DefaultValue::Constant(Value::Int(5)), DefaultValue::Constant(Value::Float(5.0)), true)]
    #[case::other_constant(DefaultValue::Constant(Value::Int(5)), DefaultValue::Constant(Value::Int(6)), false)]
    #[case::timestamp(DefaultValue::CurrentTimestamp, DefaultValue::CurrentTimestamp, true)]
    #[case::kind(DefaultValue::CurrentTimestamp, DefaultValue::AutoIncrement, false)]
    fn test_defaults_compare_by_behavior(
        #[case] expected: DefaultValue,
        #[case] actual: DefaultValue,
        #[case] equal: bool,
    ) {
        let schema = |d: DefaultValue| {
            Schema::new().with(FieldDescriptor::new("T", "F", DataType::Int).default_value(d))
        };
        assert_eq!(schema_equal(&schema(expected), &schema(actual)), equal);
    }

    #[test]
    fn test_missing_default_is_a_mismatch() {
        let expected = car_schema("Car");
        let mut fields: Vec<FieldDescriptor> = expected.iter().cloned().collect();
        for f in fields.iter_mut().filter(|f| f.field == "DateCreated") {
            f.default = None;
        }
        let actual = fields.into_iter().fold(Schema::new(), Schema::with);

        let diff = schema_diff(&expected, &actual);
        assert_eq!(diff.len(), 1);
        assert_eq!(
            diff[0].to_string(),
            "field 'DateCreated': default is none, expected current timestamp"
        );
    }
}
