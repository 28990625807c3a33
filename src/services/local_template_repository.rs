//! services/local_template_repository.rs
//! Backend local: un archivo JSON clave-valor. Bajo la clave fija
//! `crm_message_templates` vive un mapa `id -> plantilla`.
//!
//! Toda escritura pasa por un único mutex del proceso y se persiste con
//! archivo temporal + rename. Entre procesos distintos sigue ganando el último
//! que escribe.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::{
    errors::TemplateError,
    models::template_model::{MessageTemplate, TemplateChange},
    services::template_repository::{notify, TemplateRepository, CHANGE_CHANNEL_CAPACITY},
};

/// Clave fija dentro del blob
pub const TEMPLATES_STORAGE_KEY: &str = "crm_message_templates";

type RawTemplates = Map<String, Value>;

#[derive(Clone)]
pub struct LocalTemplateRepository {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<TemplateChange>,
    /// mtime que dejó nuestra última escritura
    last_written: std::sync::Mutex<Option<SystemTime>>,
}

impl LocalTemplateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        LocalTemplateRepository {
            inner: Arc::new(Inner {
                path: path.into(),
                write_lock: Mutex::new(()),
                changes,
                last_written: std::sync::Mutex::new(None),
            }),
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Lanza una tarea que revisa el mtime del blob cada `interval` y emite
    /// `ExternallyModified` cuando otro proceso lo cambió.
    pub fn watch_external_changes(&self, interval: Duration) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut last_seen = modified_at(&inner.path);
            loop {
                tokio::time::sleep(interval).await;

                let (current, ours) = match inner.last_written.lock() {
                    Ok(guard) => (modified_at(&inner.path), *guard),
                    Err(_) => (modified_at(&inner.path), None),
                };
                if current == last_seen {
                    continue;
                }
                last_seen = current;

                if current.is_some() && current == ours {
                    continue;
                }

                log::info!(
                    "(watch_external_changes) Blob de plantillas {:?} modificado externamente",
                    inner.path
                );
                notify(&inner.changes, TemplateChange::ExternallyModified);
            }
        })
    }

    /// Lee el blob completo. Un archivo inexistente o vacío es un blob vacío;
    /// cualquier otro fallo de lectura o JSON inválido es error, así ninguna
    /// escritura parte de un blob que no se pudo leer.
    fn read_store(&self) -> Result<Map<String, Value>, TemplateError> {
        let raw = match fs::read_to_string(&self.inner.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("{:?} no contiene un objeto JSON", self.inner.path).into()),
        }
    }

    /// Colección cruda `id -> valor`. Sin la clave es una colección vacía.
    fn raw_collection(&self, store: &Map<String, Value>) -> Result<RawTemplates, TemplateError> {
        match store.get(TEMPLATES_STORAGE_KEY) {
            None | Some(Value::Null) => Ok(RawTemplates::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(anyhow!(
                "La clave {} de {:?} no es un objeto",
                TEMPLATES_STORAGE_KEY,
                self.inner.path
            )
            .into()),
        }
    }

    /// Decodifica cada registro por separado; los inválidos se omiten con log.
    fn decode_templates(raw: &RawTemplates) -> Vec<MessageTemplate> {
        raw.iter()
            .filter_map(|(id, value)| {
                match serde_json::from_value::<MessageTemplate>(value.clone()) {
                    Ok(template) => Some(template),
                    Err(e) => {
                        log::error!(
                            "(local_templates::decode_templates) Plantilla {} ilegible, se omite: {}",
                            id,
                            e
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Escribe el blob completo, conservando las demás claves y los registros
    /// que no se tocaron (aunque no se puedan decodificar).
    fn write_store(
        &self,
        mut store: Map<String, Value>,
        templates: RawTemplates,
    ) -> Result<(), TemplateError> {
        store.insert(TEMPLATES_STORAGE_KEY.to_string(), Value::Object(templates));
        let bytes = serde_json::to_vec_pretty(&Value::Object(store))?;

        let dir = match self.inner.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;

        // El watcher toma este mismo lock antes de comparar mtimes, así nunca
        // ve el archivo nuevo sin el mtime nuestro ya registrado.
        let mut last_written = self
            .inner
            .last_written
            .lock()
            .map_err(|_| anyhow!("lock de last_written envenenado"))?;
        tmp.persist(&self.inner.path)
            .map_err(|e| e.error)
            .with_context(|| format!("No se pudo reemplazar {:?}", self.inner.path))?;
        *last_written = modified_at(&self.inner.path);
        Ok(())
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[async_trait]
impl TemplateRepository for LocalTemplateRepository {
    async fn list(&self) -> Result<Vec<MessageTemplate>, TemplateError> {
        let raw = match self
            .read_store()
            .and_then(|store| self.raw_collection(&store))
        {
            Ok(raw) => raw,
            Err(e) => {
                log::error!(
                    "(local_templates::list) Blob {:?} ilegible, se lista vacío: {}",
                    self.inner.path,
                    e
                );
                return Ok(Vec::new());
            }
        };

        let mut templates = Self::decode_templates(&raw);
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn save(
        &self,
        name: &str,
        content: &str,
        id: Option<&str>,
    ) -> Result<MessageTemplate, TemplateError> {
        let _guard = self.inner.write_lock.lock().await;

        let store = self.read_store()?;
        let mut templates = self.raw_collection(&store)?;

        let saved = match id {
            Some(existing_id) => {
                let value = templates
                    .get(existing_id)
                    .cloned()
                    .ok_or_else(|| TemplateError::NotFound(existing_id.to_string()))?;
                let mut template: MessageTemplate = serde_json::from_value(value)?;
                template.name = name.to_string();
                template.content = content.to_string();
                template
            }
            None => {
                let mut new_id = Uuid::new_v4().to_string();
                while templates.contains_key(&new_id) {
                    new_id = Uuid::new_v4().to_string();
                }
                MessageTemplate::new(new_id, name.to_string(), content.to_string(), Utc::now())
            }
        };
        templates.insert(saved.id.clone(), serde_json::to_value(&saved)?);

        self.write_store(store, templates)?;

        log::info!(
            "(local_templates::save) Plantilla '{}' guardada (ID={})",
            saved.name,
            saved.id
        );
        notify(&self.inner.changes, TemplateChange::Saved(saved.id.clone()));
        Ok(saved)
    }

    async fn delete(&self, id: &str) -> Result<bool, TemplateError> {
        let _guard = self.inner.write_lock.lock().await;

        let store = self.read_store()?;
        let mut templates = self.raw_collection(&store)?;
        if templates.remove(id).is_none() {
            return Ok(false);
        }

        self.write_store(store, templates)?;
        notify(&self.inner.changes, TemplateChange::Deleted(id.to_string()));
        Ok(true)
    }

    async fn mark_used(&self, id: &str) -> Result<Option<MessageTemplate>, TemplateError> {
        let _guard = self.inner.write_lock.lock().await;

        let store = self.read_store()?;
        let mut templates = self.raw_collection(&store)?;
        let Some(value) = templates.get(id).cloned() else {
            return Ok(None);
        };
        let mut template: MessageTemplate = serde_json::from_value(value)?;
        template.mark_used(Utc::now());
        templates.insert(id.to_string(), serde_json::to_value(&template)?);

        self.write_store(store, templates)?;
        notify(&self.inner.changes, TemplateChange::Used(id.to_string()));
        Ok(Some(template))
    }

    fn subscribe(&self) -> broadcast::Receiver<TemplateChange> {
        self.inner.changes.subscribe()
    }
}
