use super::helpers::{ensure_valid, format_for};
use crate::error::Result;
use crate::format::FormatRegistry;
use crate::model::FieldMap;
use crate::store::RecordStore;

/// Validates and stores a new record, returning its generated id.
pub fn run(
    registry: &FormatRegistry,
    store: &RecordStore,
    format: &str,
    fields: FieldMap,
) -> Result<String> {
    let format = format_for(registry, format)?;
    ensure_valid(format, store, &fields)?;
    store.create(&format.name, fields)
}

#[cfg(test)]
mod tests {
    use crate::error::ShelfError;
    use crate::model::FieldMap;
    use crate::store::memory::fixtures::ServiceFixture;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn adds_valid_author() {
        let fx = ServiceFixture::empty();
        let id = fx
            .service
            .add_record("author", fields(&[("name", "George Orwell"), ("birthdate", "1903")]))
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(fx.backend.count("author"), 1);
    }

    #[test]
    fn lowercase_name_fails_validation() {
        let fx = ServiceFixture::empty();
        let err = fx
            .service
            .add_record("author", fields(&[("name", "george orwell"), ("birthdate", "1903")]))
            .unwrap_err();
        match err {
            ShelfError::ValidationFailed(failed) => {
                assert_eq!(
                    failed,
                    fields(&[("name", "doesn't match regular expression")])
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fx.backend.count("author"), 0);
    }

    #[test]
    fn reports_every_failing_field() {
        let fx = ServiceFixture::new();
        let err = fx
            .service
            .add_record(
                "book",
                fields(&[("name", "nineteen"), ("year", "1949AD"), ("publisher", "Secker")]),
            )
            .unwrap_err();
        let ShelfError::ValidationFailed(failed) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(failed.len(), 3);
        assert_eq!(failed["year"], "not a valid year number");
        assert_eq!(failed["publisher"], "not a field of format 'book'");
        assert_eq!(fx.backend.count("book"), 3);
    }

    #[test]
    fn book_needs_an_existing_author() {
        let fx = ServiceFixture::new();
        let err = fx
            .service
            .add_record(
                "book",
                fields(&[("name", "Nineteen Eighty"), ("year", "1949"), ("author", "nobody")]),
            )
            .unwrap_err();
        let ShelfError::ValidationFailed(failed) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(
            failed["author"],
            "record of format 'author' and ID 'nobody' not found"
        );

        let orwell = fx.authors[1].as_str();
        fx.service
            .add_record(
                "book",
                fields(&[("name", "Nineteen Eighty"), ("year", "1949"), ("author", orwell)]),
            )
            .unwrap();
        assert_eq!(fx.backend.count("book"), 4);
    }

    #[test]
    fn rejects_records_that_carry_an_id() {
        let fx = ServiceFixture::empty();
        assert!(matches!(
            fx.service
                .add_record("author", fields(&[("id", "abc"), ("name", "George Orwell")])),
            Err(ShelfError::RecordHasId)
        ));
    }

    #[test]
    fn unknown_format() {
        let fx = ServiceFixture::empty();
        assert!(matches!(
            fx.service.add_record("magazine", FieldMap::new()),
            Err(ShelfError::FormatNotFound(name)) if name == "magazine"
        ));
    }
}
