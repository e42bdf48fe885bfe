use super::{Config, StoreBackendKind};

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) =
            std::env::var("BRANDVOICE_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
            && !key.is_empty()
        {
            self.provider.api_key = Some(key);
        }

        if let Ok(base_url) = std::env::var("BRANDVOICE_BASE_URL")
            && !base_url.is_empty()
        {
            self.provider.base_url = base_url;
        }

        if let Ok(model) = std::env::var("BRANDVOICE_MODEL")
            && !model.is_empty()
        {
            self.provider.model = model;
        }

        if let Ok(store) = std::env::var("BRANDVOICE_STORE") {
            match StoreBackendKind::parse(&store) {
                Some(backend) => self.store.backend = backend,
                None if !store.is_empty() => {
                    tracing::warn!(value = store.as_str(), "Ignoring unknown BRANDVOICE_STORE");
                }
                None => {}
            }
        }

        if let Ok(path) = std::env::var("BRANDVOICE_STORE_PATH")
            && !path.is_empty()
        {
            self.store.path = path;
        }
    }
}
