pub const KEY_SEPARATOR: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    TestRun,
    Marker,
    Project,
    TestEnv,
    Unknown,
}

impl EntityType {
    fn tag(self) -> &'static str {
        match self {
            Self::TestRun => "TEST",
            Self::Marker => "MARKER",
            Self::Project => "PROJECT",
            Self::TestEnv => "TEST_ENV",
            Self::Unknown => "",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "TEST" => Some(Self::TestRun),
            "MARKER" => Some(Self::Marker),
            "PROJECT" => Some(Self::Project),
            "TEST_ENV" => Some(Self::TestEnv),
            _ => None,
        }
    }
}

/// Builds the composite key for an entity. `Unknown` has no tag and encodes
/// to the bare id, which keeps legacy separator-less records stable across
/// a decode/encode cycle.
pub fn encode(entity: EntityType, id: &str) -> String {
    match entity {
        EntityType::Unknown => id.to_string(),
        _ => format!("{}{KEY_SEPARATOR}{id}", entity.tag()),
    }
}

/// Splits a composite key into its entity type and id. Keys without a
/// separator, and keys with an unrecognized tag, decode to `Unknown` with
/// the full raw key as the id.
pub fn decode(key: &str) -> (EntityType, &str) {
    match key.split_once(KEY_SEPARATOR) {
        Some((tag, id)) => match EntityType::from_tag(tag) {
            Some(entity) => (entity, id),
            None => (EntityType::Unknown, key),
        },
        None => (EntityType::Unknown, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_each_entity_tag() {
        assert_eq!(encode(EntityType::TestRun, "abc123"), "TEST#abc123");
        assert_eq!(encode(EntityType::Marker, "m-1"), "MARKER#m-1");
        assert_eq!(encode(EntityType::Project, "p-1"), "PROJECT#p-1");
        assert_eq!(encode(EntityType::TestEnv, "e-1"), "TEST_ENV#e-1");
    }

    #[test]
    fn decode_round_trips_well_formed_keys() {
        for entity in [
            EntityType::TestRun,
            EntityType::Marker,
            EntityType::Project,
            EntityType::TestEnv,
        ] {
            let key = encode(entity, "some-id");
            assert_eq!(decode(&key), (entity, "some-id"));
        }
    }

    #[test]
    fn decode_preserves_separator_less_legacy_keys() {
        assert_eq!(decode("legacy-record-42"), (EntityType::Unknown, "legacy-record-42"));
    }

    #[test]
    fn decode_preserves_unrecognized_tags() {
        assert_eq!(decode("FOO#bar"), (EntityType::Unknown, "FOO#bar"));
    }

    #[test]
    fn unknown_round_trips_through_encode() {
        let (entity, id) = decode("legacy-record-42");
        assert_eq!(encode(entity, id), "legacy-record-42");
    }

    #[test]
    fn id_may_itself_contain_the_separator() {
        let key = encode(EntityType::Marker, "group#variant");
        assert_eq!(decode(&key), (EntityType::Marker, "group#variant"));
    }
}
