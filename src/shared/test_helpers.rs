#[cfg(test)]
use crate::core::config::EnvLookup;

#[cfg(test)]
use axum::Router;

#[cfg(test)]
use std::{collections::HashMap, sync::Arc};

/// Fixed key lookup standing in for the process environment
#[cfg(test)]
pub fn map_lookup(pairs: &[(&str, &str)]) -> EnvLookup {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(move |key: &str| map.get(key).cloned())
}

/// Serve `router` on an ephemeral local port and return its base URL
#[cfg(test)]
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
