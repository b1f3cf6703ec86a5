use std::path::{Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use sled::IVec;

use crate::skills::errors::SkillTreeError;
use crate::skills::types::{PlayerTreeState, TreeStateRecord, TREE_STATE_SCHEMA_VERSION};

const TREE_STATES: &str = "skill_states";
const STATE_PREFIX: &str = "states:";

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct SkillStoreBuilder {
    path: PathBuf,
    temporary: bool,
}

impl SkillStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    /// Remove the database files when the store is dropped.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    pub fn open(self) -> Result<SkillStore, SkillTreeError> {
        SkillStore::open_with_options(self.path, self.temporary)
    }
}

/// Sled-backed persistence for per-character, per-skill tree state.
pub struct SkillStore {
    _db: sled::Db,
    states: sled::Tree,
}

impl SkillStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SkillTreeError> {
        Self::open_with_options(path, false)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, temporary: bool) -> Result<Self, SkillTreeError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::Config::new()
            .path(path_ref)
            .temporary(temporary)
            .open()?;
        let states = db.open_tree(TREE_STATES)?;
        Ok(Self { _db: db, states })
    }

    fn encode(component: &str) -> String {
        utf8_percent_encode(component, NON_ALPHANUMERIC).to_string()
    }

    fn decode(component: &str) -> String {
        percent_decode_str(component).decode_utf8_lossy().into_owned()
    }

    fn character_prefix(character: &str) -> Vec<u8> {
        format!("{}{}:", STATE_PREFIX, Self::encode(character)).into_bytes()
    }

    fn state_key(character: &str, skill: &str) -> Vec<u8> {
        format!(
            "{}{}:{}",
            STATE_PREFIX,
            Self::encode(character),
            Self::encode(skill)
        )
        .into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, SkillTreeError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, SkillTreeError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    /// Insert or update the tree state of `character` in `skill`.
    pub fn put_state(
        &self,
        character: &str,
        skill: &str,
        state: &PlayerTreeState,
    ) -> Result<(), SkillTreeError> {
        let record = TreeStateRecord::new(character, skill, state.clone());
        self.put_record(record)
    }

    pub fn put_record(&self, mut record: TreeStateRecord) -> Result<(), SkillTreeError> {
        record.schema_version = TREE_STATE_SCHEMA_VERSION;
        record.touch();
        let key = Self::state_key(&record.character, &record.skill);
        let bytes = Self::serialize(&record)?;
        self.states.insert(key, bytes)?;
        self.states.flush()?;
        Ok(())
    }

    pub fn get_record(&self, character: &str, skill: &str) -> Result<TreeStateRecord, SkillTreeError> {
        let key = Self::state_key(character, skill);
        let Some(bytes) = self.states.get(&key)? else {
            return Err(SkillTreeError::NotFound(format!(
                "tree state: {}/{}",
                character, skill
            )));
        };
        let record: TreeStateRecord = Self::deserialize(bytes)?;
        if record.schema_version != TREE_STATE_SCHEMA_VERSION {
            return Err(SkillTreeError::SchemaMismatch {
                entity: "tree_state",
                expected: TREE_STATE_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch the stored tree state.
    pub fn get_state(&self, character: &str, skill: &str) -> Result<PlayerTreeState, SkillTreeError> {
        Ok(self.get_record(character, skill)?.state)
    }

    /// Fetch the stored state, or an empty one on first access.
    pub fn load_or_default(
        &self,
        character: &str,
        skill: &str,
    ) -> Result<PlayerTreeState, SkillTreeError> {
        match self.get_state(character, skill) {
            Ok(state) => Ok(state),
            Err(SkillTreeError::NotFound(_)) => Ok(PlayerTreeState::new()),
            Err(e) => Err(e),
        }
    }

    /// Remove a stored state. Returns whether anything was removed.
    pub fn delete_state(&self, character: &str, skill: &str) -> Result<bool, SkillTreeError> {
        let removed = self.states.remove(Self::state_key(character, skill))?;
        self.states.flush()?;
        Ok(removed.is_some())
    }

    /// Skills `character` has stored state for, sorted.
    pub fn list_skills(&self, character: &str) -> Result<Vec<String>, SkillTreeError> {
        let prefix = Self::character_prefix(character);
        let mut skills = Vec::new();
        for entry in self.states.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            skills.push(Self::decode(&text));
        }
        skills.sort();
        Ok(skills)
    }

    /// Characters with any stored state, sorted and de-duplicated.
    pub fn list_characters(&self) -> Result<Vec<String>, SkillTreeError> {
        let mut characters = Vec::new();
        for entry in self.states.scan_prefix(STATE_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some((character, _skill)) = text
                .strip_prefix(STATE_PREFIX)
                .and_then(|rest| rest.split_once(':'))
            {
                characters.push(Self::decode(character));
            }
        }
        characters.sort();
        characters.dedup();
        Ok(characters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::tokens::{TokenLedger, TokenTier};
    use tempfile::TempDir;

    #[test]
    fn store_round_trip_state() {
        let dir = TempDir::new().expect("tempdir");
        let store = SkillStoreBuilder::new(dir.path()).open().expect("store");
        let mut state =
            PlayerTreeState::with_ledger(TokenLedger::with_balances([(TokenTier::Master, 7)]));
        state.set_level("root", 1);
        state.dormant_levels.insert("relic".to_string(), 3);

        store.put_state("alice", "mining", &state).expect("put");
        let fetched = store.get_state("alice", "mining").expect("get");
        assert_eq!(fetched, state);
        drop(store);
    }

    #[test]
    fn missing_state_defaults_to_empty() {
        let dir = TempDir::new().expect("tempdir");
        let store = SkillStoreBuilder::new(dir.path()).open().expect("store");
        assert!(matches!(
            store.get_state("bob", "fishing"),
            Err(SkillTreeError::NotFound(_))
        ));
        assert_eq!(
            store.load_or_default("bob", "fishing").expect("default"),
            PlayerTreeState::new()
        );
    }

    #[test]
    fn keys_escape_separators() {
        let dir = TempDir::new().expect("tempdir");
        let store = SkillStoreBuilder::new(dir.path()).open().expect("store");
        let state = PlayerTreeState::new();
        store.put_state("odd:name", "mining", &state).unwrap();
        store.put_state("odd", "name:mining", &state).unwrap();

        assert_eq!(store.list_skills("odd:name").unwrap(), vec!["mining".to_string()]);
        assert_eq!(store.list_skills("odd").unwrap(), vec!["name:mining".to_string()]);
        assert_eq!(
            store.list_characters().unwrap(),
            vec!["odd".to_string(), "odd:name".to_string()]
        );
    }

    #[test]
    fn stale_schema_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let store = SkillStoreBuilder::new(dir.path()).open().expect("store");
        let mut record = TreeStateRecord::new("alice", "mining", PlayerTreeState::new());
        record.schema_version = TREE_STATE_SCHEMA_VERSION + 1;
        store
            .states
            .insert(
                SkillStore::state_key("alice", "mining"),
                bincode::serialize(&record).unwrap(),
            )
            .unwrap();

        match store.get_state("alice", "mining") {
            Err(SkillTreeError::SchemaMismatch {
                entity,
                expected,
                found,
            }) => {
                assert_eq!(entity, "tree_state");
                assert_eq!(expected, TREE_STATE_SCHEMA_VERSION);
                assert_eq!(found, TREE_STATE_SCHEMA_VERSION + 1);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
        // A stale record is not silently replaced by an empty state.
        assert!(store.load_or_default("alice", "mining").is_err());
    }

    #[test]
    fn delete_removes_only_one_skill() {
        let dir = TempDir::new().expect("tempdir");
        let store = SkillStoreBuilder::new(dir.path()).open().expect("store");
        let state = PlayerTreeState::new();
        store.put_state("alice", "mining", &state).unwrap();
        store.put_state("alice", "fishing", &state).unwrap();

        assert!(store.delete_state("alice", "mining").unwrap());
        assert!(!store.delete_state("alice", "mining").unwrap());
        assert_eq!(store.list_skills("alice").unwrap(), vec!["fishing".to_string()]);
        assert!(matches!(
            store.get_state("alice", "mining"),
            Err(SkillTreeError::NotFound(_))
        ));
    }
}
