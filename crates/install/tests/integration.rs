//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use cpkg_config::ConflictConfig;
    use cpkg_errors::{Error, InstallError};
    use cpkg_events::{AppEvent, GeneralEvent, PackageEvent, RestoreEvent};
    use cpkg_hash::path_blob_id;
    use cpkg_install::*;
    use cpkg_store::{ContentStore, CreateRecord, EditTarget, FieldDefinition, MemoryStore};
    use cpkg_types::time::parse_iso;
    use cpkg_types::{
        BehaviourOptions, Id, InstallMode, ItemInfo, ItemUri, Language, MergeMode, PackageEntry,
        VersionNumber,
    };
    use serde_json::json;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    const DB: &str = "master";

    fn standard_template() -> Id {
        Id::parse("{AB86861A-6030-46C5-B394-E8F99E8B87DB}").unwrap()
    }

    fn en() -> Language {
        Language::parse("en").unwrap()
    }

    fn version(number: u32) -> VersionNumber {
        VersionNumber::new(number).unwrap()
    }

    /// Package entry builder for one record version
    struct ItemFixture {
        database: String,
        path: String,
        id: Id,
        template: Id,
        language: String,
        version: u32,
        base_templates: Vec<Id>,
        created: Option<String>,
        fields: Vec<(Id, String)>,
        properties: Vec<(String, String)>,
    }

    impl ItemFixture {
        fn new(path: &str, id: Id, template: Id) -> Self {
            Self {
                database: DB.to_string(),
                path: path.to_string(),
                id,
                template,
                language: "en".to_string(),
                version: 1,
                base_templates: Vec::new(),
                created: None,
                fields: Vec::new(),
                properties: Vec::new(),
            }
        }

        fn database(mut self, database: &str) -> Self {
            self.database = database.to_string();
            self
        }

        fn language(mut self, language: &str) -> Self {
            self.language = language.to_string();
            self
        }

        fn base(mut self, id: Id) -> Self {
            self.base_templates.push(id);
            self
        }

        fn field(mut self, id: Id, value: impl Into<String>) -> Self {
            self.fields.push((id, value.into()));
            self
        }

        fn created(mut self, value: &str) -> Self {
            self.created = Some(value.to_string());
            self
        }

        fn property(mut self, name: &str, value: &str) -> Self {
            self.properties.push((name.to_string(), value.to_string()));
            self
        }

        fn entry(&self) -> PackageEntry {
            let name = self.path.rsplit('/').next().unwrap_or_default();
            let mut fields: Vec<_> = self
                .fields
                .iter()
                .map(|(id, value)| json!({ "tfid": id.to_string(), "key": "", "content": value }))
                .collect();
            if !self.base_templates.is_empty() {
                let bases: Vec<String> = self.base_templates.iter().map(Id::to_string).collect();
                fields.push(json!({
                    "tfid": Id::new_random().to_string(),
                    "key": "__Base template",
                    "content": bases.join("|"),
                }));
            }
            let mut document = json!({
                "name": name,
                "id": self.id.to_string(),
                "tid": self.template.to_string(),
                "language": self.language,
                "version": self.version,
                "fields": fields,
            });
            if let Some(created) = &self.created {
                document["created"] = json!(created);
            }

            let key = format!(
                "items/{}{}/{}/{}/{}/{}",
                self.database,
                self.path, self.template, self.language, self.version, self.id
            );
            let mut entry =
                PackageEntry::new(key).with_bytes(serde_json::to_vec(&document).unwrap());
            for (name, value) in &self.properties {
                entry = entry.with_property(name.clone(), value.clone());
            }
            entry
        }
    }

    fn source(items: &[ItemFixture]) -> MemorySource {
        let mut source = MemorySource::new("test package").with_entry(
            PackageEntry::new("metadata/sc_name.txt").with_bytes(b"Test Package".to_vec()),
        );
        for item in items {
            source.push(item.entry());
        }
        source
    }

    fn install(
        store: &mut MemoryStore,
        source: &mut MemorySource,
        context: &mut ProcessingContext,
    ) -> Result<InstallReport, Error> {
        PackageInstaller::new().install_package(store, source, context)
    }

    fn existing(store: &mut MemoryStore, path: &str, id: Id) {
        let parent_path = path.rsplit_once('/').unwrap().0;
        let parent = store.ensure_path(DB, parent_path).unwrap();
        store
            .create_record(
                DB,
                CreateRecord {
                    parent_id: Some(parent.id),
                    name: path.rsplit('/').next().unwrap().to_string(),
                    template_id: standard_template(),
                    id,
                    created: None,
                },
            )
            .unwrap();
    }

    fn add_version(store: &mut MemoryStore, id: Id, number: u32) {
        let uri = ItemUri::new(DB, id, en(), version(number));
        let mut edit = store.begin_edit(EditTarget::version(&uri)).unwrap();
        edit.set_field(Id::new_random(), format!("v{number}"));
        store.end_edit(edit).unwrap();
    }

    /// Conflict hook recording every question and giving a fixed answer
    #[derive(Clone)]
    struct CountingEvents {
        answer: BehaviourOptions,
        apply_to_all: bool,
        asked: Arc<Mutex<Vec<(Id, Id)>>>,
    }

    impl CountingEvents {
        fn new(answer: BehaviourOptions, apply_to_all: bool) -> Self {
            Self {
                answer,
                apply_to_all,
                asked: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ItemInstallerEvents for CountingEvents {
        fn ask_user(
            &self,
            existing: &ItemInfo,
            incoming: &ItemInfo,
            _context: &ProcessingContext,
        ) -> Result<(BehaviourOptions, bool), Error> {
            self.asked.lock().unwrap().push((existing.id, incoming.id));
            Ok((self.answer, self.apply_to_all))
        }
    }

    struct NeverOverwrite;

    impl FileInstallerEvents for NeverOverwrite {
        fn ask_overwrite(
            &self,
            _path: &Path,
            _context: &ProcessingContext,
        ) -> Result<(bool, bool), Error> {
            Ok((false, false))
        }
    }

    #[test]
    fn test_template_declared_after_its_instance() {
        let template = Id::new_random();
        let home = Id::new_random();
        let mut source = source(&[
            ItemFixture::new("/content/home", home, template),
            ItemFixture::new("/templates/sample", template, standard_template()),
        ]);
        let mut store = MemoryStore::new().with_database(DB);
        let mut context = ProcessingContext::new();

        let report = install(&mut store, &mut source, &mut context).unwrap();

        let record = store.get_record(DB, home).unwrap().unwrap();
        assert_eq!(record.template_id, template);
        assert_eq!(record.path, "/content/home");
        assert!(store.get_record(DB, template).unwrap().is_some());
        assert_eq!(report.package, "Test Package");
        assert_eq!(report.installed_items.len(), 2);
        assert_eq!(
            store.version_numbers(DB, home, &en()).unwrap(),
            vec![version(1)]
        );
    }

    #[test]
    fn test_mutually_inheriting_templates_deadlock() {
        let (a, b) = (Id::new_random(), Id::new_random());
        let mut source = source(&[
            ItemFixture::new("/templates/a", a, standard_template()).base(b),
            ItemFixture::new("/templates/b", b, standard_template()).base(a),
        ]);
        let mut store = MemoryStore::new().with_database(DB);
        let (tx, mut rx) = cpkg_events::channel();
        let mut context = ProcessingContext::new().with_event_sender(tx);

        let err = install(&mut store, &mut source, &mut context).unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::SchedulingDeadlock { pending: 2 })
        ));

        let mut ended = None;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Package(PackageEvent::InstallEnded { success, .. }) = event {
                ended = Some(success);
            }
        }
        assert_eq!(ended, Some(false));
    }

    #[test]
    fn test_identical_embedded_blobs_are_stored_once() {
        let (f1, f2) = (Id::new_random(), Id::new_random());
        let attachment = FieldDefinition {
            name: "Blob".to_string(),
            type_label: "Attachment".to_string(),
            type_key: "attachment".to_string(),
        };
        let mut store = MemoryStore::new()
            .with_database(DB)
            .with_field(f1, attachment.clone())
            .with_field(f2, attachment);
        let payload = "QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVphYmNkZWZnaGlqa2xtbm9wcXJzdHV2d3h5eg==";
        let mut source = source(&[ItemFixture::new("/media/image", Id::new_random(), standard_template())
            .field(f1, payload)
            .field(f2, payload)]);
        let mut context = ProcessingContext::new();

        let report = install(&mut store, &mut source, &mut context).unwrap();

        let fields = store.version_fields(&report.installed_items[0]).unwrap();
        assert_eq!(fields[&f1], fields[&f2]);
        let blob_id = Id::parse(&fields[&f1]).unwrap();
        assert!(store.has_blob(DB, blob_id));
        assert_eq!(store.blob_count(DB), 1);
    }

    #[test]
    fn test_linked_blob_entries_are_installed() {
        let field = Id::new_random();
        let mut store = MemoryStore::new().with_database(DB).with_field(
            field,
            FieldDefinition {
                name: "Blob".to_string(),
                type_label: "Attachment".to_string(),
                type_key: "attachment".to_string(),
            },
        );
        let (linked, unreferenced) = (Id::new_random(), Id::new_random());
        let mut source = source(&[ItemFixture::new("/media/doc", Id::new_random(), standard_template())
            .field(field, linked.to_string())]);
        source.push(PackageEntry::new(format!("blob/{DB}/{linked}")).with_bytes(b"pdf".to_vec()));
        source.push(
            PackageEntry::new(format!("blob/{DB}/{unreferenced}")).with_bytes(b"zip".to_vec()),
        );
        let mut context = ProcessingContext::new();

        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(store.get_blob(DB, linked).unwrap(), Some(b"pdf".to_vec()));
        assert!(!store.has_blob(DB, unreferenced));
        assert_eq!(report.blobs_installed, 1);
        assert_eq!(report.blobs_skipped, 1);
    }

    #[test]
    fn test_media_stream_binds_every_declared_path() {
        let file_path = Id::new_random();
        let mut store = MemoryStore::new().with_database(DB).with_field(
            file_path,
            FieldDefinition {
                name: "File Path".to_string(),
                type_label: "Single-Line Text".to_string(),
                type_key: "text".to_string(),
            },
        );
        let declared = "/upload/report.pdf";
        let mut source = source(&[
            ItemFixture::new("/media/a", Id::new_random(), standard_template()).field(file_path, declared),
            ItemFixture::new("/media/b", Id::new_random(), standard_template()).field(file_path, declared),
        ]);
        source.push(
            PackageEntry::new(format!("blob/mediastreams/{}", path_blob_id(declared)))
                .with_bytes(b"%PDF".to_vec()),
        );
        let mut context = ProcessingContext::new();

        let report = install(&mut store, &mut source, &mut context).unwrap();

        let values: Vec<String> = report
            .installed_items
            .iter()
            .map(|uri| store.version_fields(uri).unwrap()[&file_path].clone())
            .collect();
        assert_eq!(values[0], values[1]);
        assert_ne!(values[0], declared);
        assert_eq!(store.media(&values[0]), Some(&b"%PDF"[..]));
        assert_eq!(report.blobs_installed, 1);
    }

    #[test]
    fn test_collision_kinds_are_cached_separately() {
        let mut store = MemoryStore::new().with_database(DB);
        let (moved_a, moved_b) = (Id::new_random(), Id::new_random());
        existing(&mut store, "/content/old/a", moved_a);
        existing(&mut store, "/content/old/b", moved_b);
        let (occupied_c, occupied_d) = (Id::new_random(), Id::new_random());
        existing(&mut store, "/content/c", occupied_c);
        existing(&mut store, "/content/d", occupied_d);

        let mut source = source(&[
            ItemFixture::new("/content/new/a", moved_a, standard_template()),
            ItemFixture::new("/content/new/b", moved_b, standard_template()),
            ItemFixture::new("/content/c", Id::new_random(), standard_template()),
            ItemFixture::new("/content/d", Id::new_random(), standard_template()),
        ]);
        let events = CountingEvents::new(
            BehaviourOptions::new(InstallMode::Merge, MergeMode::Append),
            true,
        );
        let asked = events.asked.clone();
        let mut context = ProcessingContext::new().with_item_events(events);

        let report = install(&mut store, &mut source, &mut context).unwrap();

        let asked = asked.lock().unwrap();
        assert_eq!(asked.len(), 2);
        let id_collisions = asked.iter().filter(|(existing, incoming)| existing == incoming);
        assert_eq!(id_collisions.count(), 1);

        // Merge keeps the colliding records in place and writes into them
        assert_eq!(report.installed_items.len(), 4);
        assert_eq!(report.stubs_created, 0);
        let written: Vec<Id> = report.installed_items.iter().map(|uri| uri.id).collect();
        assert!(written.contains(&occupied_c));
        assert!(written.contains(&occupied_d));
        assert_eq!(
            store.get_record(DB, moved_a).unwrap().unwrap().path,
            "/content/old/a"
        );
    }

    #[test]
    fn test_entry_properties_override_the_hook() {
        let mut store = MemoryStore::new().with_database(DB);
        let id = Id::new_random();
        existing(&mut store, "/content/old/a", id);
        let mut source = source(&[ItemFixture::new("/content/new/a", id, standard_template())
            .property("IdCollision.ItemMode", "Overwrite")]);
        let events = CountingEvents::new(
            BehaviourOptions::new(InstallMode::Skip, MergeMode::Undefined),
            true,
        );
        let asked = events.asked.clone();
        let mut context = ProcessingContext::new().with_item_events(events);

        install(&mut store, &mut source, &mut context).unwrap();

        assert!(asked.lock().unwrap().is_empty());
        let record = store.get_record(DB, id).unwrap().unwrap();
        assert_eq!(record.path, "/content/new/a");
    }

    #[test]
    fn test_reinstalled_child_is_spared_from_deletion() {
        let mut store = MemoryStore::new().with_database(DB);
        let (parent, kept, dropped) = (Id::new_random(), Id::new_random(), Id::new_random());
        existing(&mut store, "/content/p", parent);
        existing(&mut store, "/content/p/kept", kept);
        existing(&mut store, "/content/p/dropped", dropped);

        let mut source = source(&[
            ItemFixture::new("/content/p", parent, standard_template())
                .property("IdCollision.ItemMode", "Overwrite"),
            ItemFixture::new("/content/p/kept", kept, standard_template()),
        ]);
        let mut context = ProcessingContext::new();

        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert!(store.get_record(DB, parent).unwrap().is_some());
        assert!(store.get_record(DB, kept).unwrap().is_some());
        assert!(store.get_record(DB, dropped).unwrap().is_none());
        assert_eq!(report.records_deleted, 1);
        assert_eq!(report.delete_failures, 0);
    }

    #[test]
    fn test_append_numbers_after_existing_versions() {
        let mut store = MemoryStore::new().with_database(DB);
        let id = Id::new_random();
        existing(&mut store, "/content/a", id);
        add_version(&mut store, id, 1);
        add_version(&mut store, id, 2);

        let mut source = source(&[ItemFixture::new("/content/a", id, standard_template())
            .property("IdCollision.ItemMode", "Merge")
            .property("IdCollision.MergeMode", "Append")]);
        let mut context = ProcessingContext::new();
        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(report.installed_items[0].version, version(3));
        assert_eq!(
            store.version_numbers(DB, id, &en()).unwrap(),
            vec![version(1), version(2), version(3)]
        );
    }

    #[test]
    fn test_clear_replaces_versions_of_the_language() {
        let mut store = MemoryStore::new().with_database(DB);
        let id = Id::new_random();
        existing(&mut store, "/content/a", id);
        add_version(&mut store, id, 1);
        add_version(&mut store, id, 2);

        let mut source = source(&[ItemFixture::new("/content/a", id, standard_template())
            .property("IdCollision.ItemMode", "Merge")
            .property("IdCollision.MergeMode", "Clear")]);
        let mut context = ProcessingContext::new();
        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(report.installed_items[0].version, version(1));
        assert_eq!(store.version_numbers(DB, id, &en()).unwrap(), vec![version(1)]);
    }

    #[test]
    fn test_reinstall_with_merge_append_adds_one_version() {
        let (parent, child) = (Id::new_random(), Id::new_random());
        let items = [
            ItemFixture::new("/content/site", parent, standard_template()),
            ItemFixture::new("/content/site/page", child, standard_template()),
        ];
        let mut store = MemoryStore::new().with_database(DB);

        let mut first = ProcessingContext::new();
        let report = install(&mut store, &mut source(&items), &mut first).unwrap();
        assert_eq!(report.stubs_created, 2);
        let records = store.record_count(DB);

        let mut second = ProcessingContext::new();
        second.config.conflicts = ConflictConfig {
            item_mode: InstallMode::Merge,
            merge_mode: MergeMode::Append,
            apply_to_all: true,
        };
        let report = install(&mut store, &mut source(&items), &mut second).unwrap();

        assert_eq!(store.record_count(DB), records);
        assert_eq!(report.stubs_created, 0);
        assert_eq!(report.records_deleted, 0);
        for id in [parent, child] {
            assert_eq!(
                store.version_numbers(DB, id, &en()).unwrap(),
                vec![version(1), version(2)]
            );
        }
    }

    #[test]
    fn test_undefined_item_mode_fails_with_entry_key() {
        let mut store = MemoryStore::new().with_database(DB);
        let id = Id::new_random();
        existing(&mut store, "/content/a", id);
        let item = ItemFixture::new("/content/a", id, standard_template());
        let key = item.entry().key().to_string();
        let mut source = source(&[item]);
        let mut context = ProcessingContext::new().with_item_events(CountingEvents::new(
            BehaviourOptions::default(),
            false,
        ));

        let err = install(&mut store, &mut source, &mut context).unwrap_err();
        match err {
            Error::Install(InstallError::EntryFailed { key: failed, .. }) => assert_eq!(failed, key),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cancelled_run_reports_cancellation() {
        let mut store = MemoryStore::new().with_database(DB);
        let mut source = source(&[ItemFixture::new(
            "/content/a",
            Id::new_random(),
            standard_template(),
        )]);
        let mut context = ProcessingContext::new();
        context.cancel.cancel();

        let err = install(&mut store, &mut source, &mut context).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(context.post_action_count(), 0);
        assert_eq!(store.record_count(DB), 0);
    }

    #[test]
    fn test_future_timestamps_are_clamped() {
        let mut context = ProcessingContext::new();
        let ids = context.config.ids.clone();
        let mut store = MemoryStore::new().with_database(DB);
        let mut source = source(&[ItemFixture::new("/content/a", Id::new_random(), standard_template())
            .created("20990101T000000Z")
            .field(ids.updated_field, "20990101T000000Z")]);

        let report = install(&mut store, &mut source, &mut context).unwrap();

        let fields = store.version_fields(&report.installed_items[0]).unwrap();
        let now = chrono::Utc::now();
        for field in [ids.created_field, ids.updated_field] {
            let value = parse_iso(&fields[&field]).unwrap();
            assert!(value <= now);
        }
    }

    #[test]
    fn test_files_are_written_below_the_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/kept.dll"), b"old").unwrap();

        let mut store = MemoryStore::new().with_database(DB);
        let mut source = source(&[]);
        source.push(PackageEntry::new("files/bin/new.dll").with_bytes(b"new".to_vec()));
        source.push(PackageEntry::new("files/bin/kept.dll").with_bytes(b"replaced".to_vec()));
        source.push(PackageEntry::new("files/../escape.dll").with_bytes(b"x".to_vec()));
        let mut context = ProcessingContext::new().with_file_events(NeverOverwrite);
        context.config.files.root = Some(dir.path().to_path_buf());

        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(std::fs::read(dir.path().join("bin/new.dll")).unwrap(), b"new");
        assert_eq!(std::fs::read(dir.path().join("bin/kept.dll")).unwrap(), b"old");
        assert!(!dir.path().join("../escape.dll").exists());
        assert_eq!(report.files_installed, vec![dir.path().join("bin/new.dll")]);
    }

    #[test]
    fn test_side_by_side_creates_a_sibling() {
        let mut store = MemoryStore::new().with_database(DB);
        let (occupant, incoming) = (Id::new_random(), Id::new_random());
        existing(&mut store, "/content/a", occupant);
        add_version(&mut store, occupant, 1);

        let mut source = source(&[ItemFixture::new("/content/a", incoming, standard_template())
            .property("PathCollision.ItemMode", "SideBySide")]);
        let mut context = ProcessingContext::new();
        let report = install(&mut store, &mut source, &mut context).unwrap();

        let old = store.get_record(DB, occupant).unwrap().unwrap();
        let new = store.get_record(DB, incoming).unwrap().unwrap();
        assert_eq!(new.parent_id, old.parent_id);
        assert_eq!(new.name, "a");
        assert_eq!(old.path, "/content/a");
        assert_eq!(
            store.version_numbers(DB, occupant, &en()).unwrap(),
            vec![version(1)]
        );
        assert_eq!(report.stubs_created, 1);
        assert_eq!(report.installed_items.len(), 1);
        assert_eq!(report.installed_items[0].id, incoming);

        let parent = old.parent_id.unwrap();
        let named_a = store
            .children(DB, parent)
            .unwrap()
            .into_iter()
            .filter(|child| child.name == "a")
            .count();
        assert_eq!(named_a, 2);
    }

    #[test]
    fn test_overwrite_replaces_record_with_other_id() {
        let mut store = MemoryStore::new().with_database(DB);
        let (occupant, kid, incoming) = (Id::new_random(), Id::new_random(), Id::new_random());
        existing(&mut store, "/content/a", occupant);
        existing(&mut store, "/content/a/kid", kid);
        add_version(&mut store, occupant, 1);
        add_version(&mut store, occupant, 2);

        let mut source = source(&[ItemFixture::new("/content/a", incoming, standard_template())
            .property("PathCollision.ItemMode", "Overwrite")]);
        let mut context = ProcessingContext::new();
        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert!(store.get_record(DB, occupant).unwrap().is_none());
        assert!(store.get_record(DB, kid).unwrap().is_none());
        let record = store.get_record(DB, incoming).unwrap().unwrap();
        assert_eq!(record.path, "/content/a");
        assert_eq!(record.template_id, standard_template());
        assert_eq!(report.stubs_created, 1);
        assert_eq!(
            store.version_numbers(DB, incoming, &en()).unwrap(),
            vec![version(1)]
        );
    }

    #[test]
    fn test_template_field_sharing_is_written_to_the_record() {
        let mut context = ProcessingContext::new();
        let ids = context.config.ids.clone();
        let mut store = MemoryStore::new().with_database(DB);
        let field = Id::new_random();
        let mut source = source(&[ItemFixture::new(
            "/templates/sample/data/title",
            field,
            ids.template_field_template,
        )
        .field(ids.shared_field, "1")]);

        install(&mut store, &mut source, &mut context).unwrap();

        let shared = store.shared_fields(DB, field).unwrap();
        assert_eq!(shared[&ids.shared_field], "1");
        assert_eq!(shared[&ids.unversioned_field], "");
    }

    #[test]
    fn test_plain_record_gets_no_sharing_fields() {
        let mut context = ProcessingContext::new();
        let ids = context.config.ids.clone();
        let mut store = MemoryStore::new().with_database(DB);
        let id = Id::new_random();
        let mut source = source(&[ItemFixture::new("/content/a", id, standard_template())
            .field(ids.shared_field, "1")]);

        install(&mut store, &mut source, &mut context).unwrap();

        let shared = store.shared_fields(DB, id).unwrap();
        assert!(!shared.contains_key(&ids.shared_field));
        assert!(!shared.contains_key(&ids.unversioned_field));
    }

    fn three_id_collisions(store: &mut MemoryStore) -> (Vec<Id>, MemorySource) {
        let ids: Vec<Id> = (0..3).map(|_| Id::new_random()).collect();
        let mut items = Vec::new();
        for (n, id) in ids.iter().enumerate() {
            let path = format!("/content/item{n}");
            existing(store, &path, *id);
            items.push(ItemFixture::new(&path, *id, standard_template()));
        }
        (ids, source(&items))
    }

    #[test]
    fn test_apply_to_all_asks_once_per_kind() {
        let mut store = MemoryStore::new().with_database(DB);
        let (ids, mut source) = three_id_collisions(&mut store);
        let events = CountingEvents::new(
            BehaviourOptions::new(InstallMode::Merge, MergeMode::Append),
            true,
        );
        let asked = events.asked.clone();
        let mut context = ProcessingContext::new().with_item_events(events);

        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(*asked.lock().unwrap(), vec![(ids[0], ids[0])]);
        assert_eq!(report.installed_items.len(), 3);
        for id in ids {
            assert_eq!(store.version_numbers(DB, id, &en()).unwrap(), vec![version(1)]);
        }
    }

    #[test]
    fn test_without_apply_to_all_every_collision_is_asked() {
        let mut store = MemoryStore::new().with_database(DB);
        let (ids, mut source) = three_id_collisions(&mut store);
        let events = CountingEvents::new(
            BehaviourOptions::new(InstallMode::Merge, MergeMode::Append),
            false,
        );
        let asked = events.asked.clone();
        let mut context = ProcessingContext::new().with_item_events(events);

        install(&mut store, &mut source, &mut context).unwrap();

        let expected: Vec<(Id, Id)> = ids.iter().map(|id| (*id, *id)).collect();
        assert_eq!(*asked.lock().unwrap(), expected);
    }

    #[test]
    fn test_languages_of_one_record_share_a_resolution() {
        let mut store = MemoryStore::new().with_database(DB);
        let (occupant, incoming) = (Id::new_random(), Id::new_random());
        existing(&mut store, "/content/a", occupant);
        let mut source = source(&[
            ItemFixture::new("/content/a", incoming, standard_template()),
            ItemFixture::new("/content/a", incoming, standard_template()).language("de"),
        ]);
        let events = CountingEvents::new(
            BehaviourOptions::new(InstallMode::Merge, MergeMode::Append),
            false,
        );
        let asked = events.asked.clone();
        let mut context = ProcessingContext::new().with_item_events(events);

        let report = install(&mut store, &mut source, &mut context).unwrap();

        // resolved once for the incoming id, although both versions land on the occupant
        assert_eq!(*asked.lock().unwrap(), vec![(occupant, incoming)]);
        assert!(store.get_record(DB, incoming).unwrap().is_none());
        assert!(report.installed_items.iter().all(|uri| uri.id == occupant));
        let de = Language::parse("de").unwrap();
        for language in [en(), de] {
            assert_eq!(
                store.version_numbers(DB, occupant, &language).unwrap(),
                vec![version(1)]
            );
        }
    }

    #[test]
    fn test_children_of_moved_record_are_deleted_unless_reinstalled() {
        let mut store = MemoryStore::new().with_database(DB);
        let (parent, kept, dropped) = (Id::new_random(), Id::new_random(), Id::new_random());
        existing(&mut store, "/content/old/p", parent);
        existing(&mut store, "/content/old/p/kept", kept);
        existing(&mut store, "/content/old/p/dropped", dropped);

        let mut source = source(&[
            ItemFixture::new("/content/new/p", parent, standard_template()),
            ItemFixture::new("/content/new/p/kept", kept, standard_template()),
        ]);
        let events = CountingEvents::new(
            BehaviourOptions::new(InstallMode::Overwrite, MergeMode::Undefined),
            true,
        );
        let asked = events.asked.clone();
        let (tx, mut rx) = cpkg_events::channel();
        let mut context = ProcessingContext::new()
            .with_item_events(events)
            .with_event_sender(tx);

        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(asked.lock().unwrap().len(), 1);
        assert_eq!(
            store.get_record(DB, parent).unwrap().unwrap().path,
            "/content/new/p"
        );
        assert_eq!(
            store.get_record(DB, kept).unwrap().unwrap().path,
            "/content/new/p/kept"
        );
        assert!(store.get_record(DB, dropped).unwrap().is_none());
        assert_eq!(report.records_deleted, 1);

        let mut deleted = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Restore(RestoreEvent::RecordDeleted { id, .. }) = event {
                deleted.push(id);
            }
        }
        assert_eq!(deleted, vec![dropped]);
    }

    #[test]
    fn test_postponed_entry_failure_carries_its_key() {
        let template = Id::new_random();
        let blocked = ItemFixture::new("/content/home", Id::new_random(), template).database("web");
        let key = blocked.entry().key().to_string();
        let mut source = source(&[
            blocked,
            ItemFixture::new("/templates/sample", template, standard_template()).database("web"),
        ]);
        let mut store = MemoryStore::new().with_database(DB);
        let mut context = ProcessingContext::new();

        let err = install(&mut store, &mut source, &mut context).unwrap_err();
        match err {
            Error::Install(InstallError::EntryFailed { key: failed, .. }) => assert_eq!(failed, key),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_item_key_is_reported_and_skipped() {
        let mut store = MemoryStore::new().with_database(DB);
        let id = Id::new_random();
        let mut source = source(&[ItemFixture::new("/content/a", id, standard_template())]);
        source.push(PackageEntry::new("items/master/content/broken").with_bytes(b"{}".to_vec()));
        let (tx, mut rx) = cpkg_events::channel();
        let mut context = ProcessingContext::new().with_event_sender(tx);

        let report = install(&mut store, &mut source, &mut context).unwrap();

        assert_eq!(report.installed_items.len(), 1);
        assert!(store.get_record(DB, id).unwrap().is_some());
        let mut warned = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::General(GeneralEvent::Warning { key, .. }) = event {
                warned.push(key);
            }
        }
        assert_eq!(warned, vec!["items/master/content/broken".to_string()]);
    }
}
