//! tests/template_tests.rs
//! Contrato de `TemplateRepository` sobre ambos backends y política de
//! `TemplateService`.

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc, time::Duration};

    use tempfile::TempDir;

    use crate::database::setup_test_database;
    use crate::errors::TemplateError;
    use crate::models::template_model::TemplateChange;
    use crate::services::local_template_repository::{
        LocalTemplateRepository, TEMPLATES_STORAGE_KEY,
    };
    use crate::services::sqlite_template_repository::SqliteTemplateRepository;
    use crate::services::template_repository::TemplateRepository;
    use crate::services::template_service::TemplateService;

    async fn sqlite_repo() -> Arc<dyn TemplateRepository> {
        let db_pool = setup_test_database().await.expect("test database");
        Arc::new(SqliteTemplateRepository::new(db_pool, "operator-1"))
    }

    /// El TempDir debe vivir mientras dure el test
    fn local_repo() -> (TempDir, LocalTemplateRepository) {
        let dir = TempDir::new().expect("temp dir");
        let repo = LocalTemplateRepository::new(dir.path().join("templates.json"));
        (dir, repo)
    }

    async fn pause() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // ------------------------------------------------------------------
    // Contrato compartido
    // ------------------------------------------------------------------

    async fn create_assigns_fresh_ids(repo: Arc<dyn TemplateRepository>) {
        let a = repo.save("Bienvenida", "Hola {{name}}", None).await.unwrap();
        let b = repo.save("Bienvenida", "Hola otra vez", None).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.use_count, 0);
        assert_eq!(b.use_count, 0);
        assert!(a.last_used.is_none());
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    async fn update_keeps_id_and_created_at(repo: Arc<dyn TemplateRepository>) {
        let original = repo.save("Promo", "10% off", None).await.unwrap();
        pause().await;
        let updated = repo
            .save("Promo v2", "20% off", Some(&original.id))
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.name, "Promo v2");
        assert_eq!(updated.content, "20% off");

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], updated);
    }

    async fn update_of_missing_id_is_not_found(repo: Arc<dyn TemplateRepository>) {
        repo.save("Existente", "x", None).await.unwrap();
        let err = repo.save("Nada", "y", Some("missing-id")).await.unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(ref id) if id == "missing-id"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    async fn delete_reports_existence(repo: Arc<dyn TemplateRepository>) {
        let keep = repo.save("Keep", "k", None).await.unwrap();
        let gone = repo.save("Gone", "g", None).await.unwrap();
        let before = repo.list().await.unwrap();

        assert!(!repo.delete("does-not-exist").await.unwrap());
        assert_eq!(repo.list().await.unwrap(), before);

        assert!(repo.delete(&gone.id).await.unwrap());
        assert!(!repo.delete(&gone.id).await.unwrap());
        let after = repo.list().await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, keep.id);
    }

    async fn use_increments_count(repo: Arc<dyn TemplateRepository>) {
        let t = repo.save("Uso", "contenido", None).await.unwrap();

        let first = repo.mark_used(&t.id).await.unwrap().expect("exists");
        assert_eq!(first.use_count, 1);
        let first_used = first.last_used.expect("last_used set");

        pause().await;
        let second = repo.mark_used(&t.id).await.unwrap().expect("exists");
        assert_eq!(second.use_count, 2);
        assert!(second.last_used.expect("last_used set") >= first_used);
        assert_eq!(second.content, "contenido");

        assert!(repo.mark_used("missing").await.unwrap().is_none());
    }

    async fn list_is_newest_first(repo: Arc<dyn TemplateRepository>) {
        let first = repo.save("uno", "1", None).await.unwrap();
        pause().await;
        let second = repo.save("dos", "2", None).await.unwrap();
        pause().await;
        let third = repo.save("tres", "3", None).await.unwrap();

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    async fn emits_change_notifications(repo: Arc<dyn TemplateRepository>) {
        let mut rx = repo.subscribe();
        let t = repo.save("n", "c", None).await.unwrap();
        repo.mark_used(&t.id).await.unwrap();
        repo.delete(&t.id).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), TemplateChange::Saved(t.id.clone()));
        assert_eq!(rx.recv().await.unwrap(), TemplateChange::Used(t.id.clone()));
        assert_eq!(rx.recv().await.unwrap(), TemplateChange::Deleted(t.id));
    }

    #[tokio::test]
    async fn sqlite_repository_contract() {
        create_assigns_fresh_ids(sqlite_repo().await).await;
        update_keeps_id_and_created_at(sqlite_repo().await).await;
        update_of_missing_id_is_not_found(sqlite_repo().await).await;
        delete_reports_existence(sqlite_repo().await).await;
        use_increments_count(sqlite_repo().await).await;
        list_is_newest_first(sqlite_repo().await).await;
        emits_change_notifications(sqlite_repo().await).await;
    }

    #[tokio::test]
    async fn local_repository_contract() {
        macro_rules! with_local {
            ($check:ident) => {{
                let (_dir, repo) = local_repo();
                $check(Arc::new(repo)).await;
            }};
        }
        with_local!(create_assigns_fresh_ids);
        with_local!(update_keeps_id_and_created_at);
        with_local!(update_of_missing_id_is_not_found);
        with_local!(delete_reports_existence);
        with_local!(use_increments_count);
        with_local!(list_is_newest_first);
        with_local!(emits_change_notifications);
    }

    // ------------------------------------------------------------------
    // SQLite
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn sqlite_templates_are_scoped_by_user() {
        let db_pool = setup_test_database().await.unwrap();
        let mine = SqliteTemplateRepository::new(db_pool.clone(), "operator-1");
        let theirs = SqliteTemplateRepository::new(db_pool, "operator-2");

        let t = mine.save("Mía", "privada", None).await.unwrap();

        assert!(theirs.list().await.unwrap().is_empty());
        assert!(!theirs.delete(&t.id).await.unwrap());
        assert!(theirs.mark_used(&t.id).await.unwrap().is_none());
        assert!(matches!(
            theirs.save("x", "y", Some(&t.id)).await,
            Err(TemplateError::NotFound(_))
        ));
        assert_eq!(mine.list().await.unwrap().len(), 1);
    }

    // ------------------------------------------------------------------
    // Blob local
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn local_corrupt_blob_lists_empty_and_is_never_overwritten() {
        let (_dir, repo) = local_repo();
        std::fs::write(repo.path(), "{ not json").unwrap();

        assert!(repo.list().await.unwrap().is_empty());

        let service = TemplateService::new(Arc::new(repo.clone()));
        assert!(service.list().await.is_empty());

        assert!(matches!(
            service.save("Nueva", "contenido", None).await,
            Err(TemplateError::Serialization(_))
        ));
        assert!(!service.delete("x").await);
        assert!(service.use_template("x").await.is_none());
        assert_eq!(std::fs::read_to_string(repo.path()).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn local_collection_under_wrong_shape_is_ignored() {
        let (_dir, repo) = local_repo();
        let blob = serde_json::json!({ "crm_message_templates": "garbage" });
        std::fs::write(repo.path(), blob.to_string()).unwrap();

        assert!(repo.list().await.unwrap().is_empty());
        assert!(repo.save("a", "b", None).await.is_err());

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        assert_eq!(raw, blob.to_string());
    }

    #[tokio::test]
    async fn local_bad_record_is_skipped_but_kept_on_write() {
        let (_dir, repo) = local_repo();
        let blob = serde_json::json!({
            "crm_message_templates": {
                "a": {
                    "id": "a",
                    "name": "Válida",
                    "content": "hola",
                    "created_at": "2026-01-01T00:00:00Z",
                    "last_used": null,
                    "use_count": 2
                },
                "b": { "id": "b", "name": "Rota", "use_count": -1 }
            }
        });
        std::fs::write(repo.path(), blob.to_string()).unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");

        let c = repo.save("C", "z", None).await.unwrap();
        repo.mark_used("a").await.unwrap().expect("a exists");

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let collection = &stored[TEMPLATES_STORAGE_KEY];
        assert_eq!(collection["a"]["use_count"], 3);
        assert_eq!(collection["b"]["use_count"], -1);
        assert_eq!(collection[&c.id]["name"], "C");

        // El registro ilegible no se puede actualizar, pero sí borrar
        assert!(repo.save("B", "x", Some("b")).await.is_err());
        assert!(repo.delete("b").await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn local_unreadable_blob_aborts_writes() {
        let dir = TempDir::new().expect("temp dir");
        // Un directorio en lugar del archivo: la lectura falla con algo distinto de NotFound
        let path = dir.path().join("templates.json");
        std::fs::create_dir(&path).unwrap();
        let repo = LocalTemplateRepository::new(path.clone());

        assert!(repo.list().await.unwrap().is_empty());
        assert!(matches!(
            repo.save("a", "b", None).await,
            Err(TemplateError::Io(_))
        ));
        assert!(repo.delete("a").await.is_err());
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn local_write_keeps_other_keys() {
        let (_dir, repo) = local_repo();
        std::fs::write(repo.path(), r#"{"theme":"dark"}"#).unwrap();

        let t = repo.save("a", "b", None).await.unwrap();

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let blob: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(blob["theme"], "dark");
        assert_eq!(blob[TEMPLATES_STORAGE_KEY][&t.id]["name"], "a");
    }

    #[tokio::test]
    async fn local_concurrent_saves_do_not_lose_updates() {
        let (_dir, repo) = local_repo();

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.save(&format!("t{}", i), "body", None).await.unwrap().id
            }));
        }

        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.unwrap());
        }

        let listed: HashSet<String> = repo.list().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 16);
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn local_concurrent_uses_count_every_call() {
        let (_dir, repo) = local_repo();
        let t = repo.save("popular", "x", None).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let repo = repo.clone();
            let id = t.id.clone();
            handles.push(tokio::spawn(async move { repo.mark_used(&id).await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].use_count, 10);
    }

    #[tokio::test]
    async fn local_own_writes_are_not_reported_as_external() {
        let (_dir, repo) = local_repo();
        let mut rx = repo.subscribe();
        let watcher = repo.watch_external_changes(Duration::from_millis(1));

        for i in 0..20 {
            repo.save(&format!("t{}", i), "x", None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        watcher.abort();

        let mut saved = 0;
        while let Ok(change) = rx.try_recv() {
            assert_ne!(change, TemplateChange::ExternallyModified);
            saved += 1;
        }
        assert_eq!(saved, 20);
    }

    #[tokio::test]
    async fn local_external_modification_is_notified() {
        let (_dir, repo) = local_repo();
        repo.save("inicial", "x", None).await.unwrap();

        let mut rx = repo.subscribe();
        let watcher = repo.watch_external_changes(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Otro proceso reescribe el blob
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(repo.path(), r#"{"crm_message_templates":{}}"#).unwrap();

        let change = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Ok(TemplateChange::ExternallyModified) => break true,
                    Ok(_) => continue,
                    Err(_) => break false,
                }
            }
        })
        .await
        .unwrap_or(false);
        watcher.abort();

        assert!(change, "expected ExternallyModified notification");
        assert!(repo.list().await.unwrap().is_empty());
    }

    // ------------------------------------------------------------------
    // TemplateService
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn service_rejects_blank_name_or_content() {
        let service = TemplateService::new(sqlite_repo().await);

        assert!(matches!(
            service.save("   ", "contenido", None).await,
            Err(TemplateError::Validation(_))
        ));
        assert!(matches!(
            service.save("nombre", "  \n ", None).await,
            Err(TemplateError::Validation(_))
        ));
        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn service_trims_name_and_reports_missing() {
        let service = TemplateService::new(sqlite_repo().await);

        let t = service.save("  Saludo  ", "Hola", None).await.unwrap();
        assert_eq!(t.name, "Saludo");

        assert!(!service.delete("nope").await);
        assert!(service.use_template("nope").await.is_none());

        let used = service.use_template(&t.id).await.expect("exists");
        assert_eq!(used.content, "Hola");
        assert_eq!(used.use_count, 1);
        assert!(service.delete(&t.id).await);
    }
}
