use super::helpers::format_for;
use crate::error::Result;
use crate::format::FormatRegistry;
use crate::model::FieldMap;
use crate::store::RecordStore;

pub fn run(
    registry: &FormatRegistry,
    store: &RecordStore,
    format: &str,
    id: &str,
) -> Result<FieldMap> {
    let format = format_for(registry, format)?;
    store.read_one(&format.name, id)
}

#[cfg(test)]
mod tests {
    use crate::error::ShelfError;
    use crate::model::FieldMap;
    use crate::store::memory::fixtures::ServiceFixture;

    #[test]
    fn added_record_reads_back_with_its_id() {
        let fx = ServiceFixture::empty();
        let submitted: FieldMap = [("name", "George Orwell"), ("birthdate", "1903")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let id = fx.service.add_record("author", submitted.clone()).unwrap();

        let mut expected = submitted;
        expected.insert("id".into(), id.clone());
        assert_eq!(fx.service.get_record("author", &id).unwrap(), expected);
    }

    #[test]
    fn ids_are_scoped_to_their_format() {
        let fx = ServiceFixture::new();
        assert!(matches!(
            fx.service.get_record("book", &fx.authors[0]),
            Err(ShelfError::RecordNotFound(_))
        ));
    }

    #[test]
    fn unknown_format() {
        let fx = ServiceFixture::new();
        assert!(matches!(
            fx.service.get_record("magazine", "1"),
            Err(ShelfError::FormatNotFound(_))
        ));
    }
}
