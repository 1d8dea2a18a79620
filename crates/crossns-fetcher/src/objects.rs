//! Object collections and the per-namespace list client
//!
//! The fetcher lists every kind as [`DynamicObject`]s and loads them into a
//! caller-chosen [`ObjectList`]. Callers that know the concrete type use
//! [`TypedList`]; callers that only forward objects use `Vec<DynamicObject>`.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crossns_common::{Error, RequiredResourceKind, Result};

/// A collection the fetcher can fill with listed objects
pub trait ObjectList: Send + 'static {
    /// Append listed objects, converting them as needed
    fn extend_dynamic(&mut self, objects: Vec<DynamicObject>) -> Result<()>;

    /// Number of objects held
    fn len(&self) -> usize;

    /// Whether no objects are held
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectList for Vec<DynamicObject> {
    fn extend_dynamic(&mut self, objects: Vec<DynamicObject>) -> Result<()> {
        self.extend(objects);
        Ok(())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Objects deserialized into a concrete type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedList<K> {
    /// The decoded objects, in list order
    pub items: Vec<K>,
}

impl<K> TypedList<K> {
    /// An empty list
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }
}

impl<K> Default for TypedList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ObjectList for TypedList<K>
where
    K: DeserializeOwned + Send + 'static,
{
    fn extend_dynamic(&mut self, objects: Vec<DynamicObject>) -> Result<()> {
        self.items.reserve(objects.len());
        for object in objects {
            let name = object.metadata.name.clone().unwrap_or_default();
            let value = serde_json::to_value(object).map_err(|e| {
                Error::internal_with_context("decode", format!("object {name}: {e}"))
            })?;
            let item = serde_json::from_value(value).map_err(|e| {
                Error::internal_with_context("decode", format!("object {name}: {e}"))
            })?;
            self.items.push(item);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Lists objects of one registered kind in one namespace
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KubernetesClient: Send + Sync {
    /// List every `kind` object in `namespace`
    async fn list(&self, namespace: &str, kind: &RequiredResourceKind) -> Result<Vec<DynamicObject>>;
}

/// [`KubernetesClient`] backed by the dynamic API
#[derive(Clone)]
pub struct DynamicObjectClient {
    client: Client,
}

impl DynamicObjectClient {
    /// Wrap a client; lists run with its credentials
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubernetesClient for DynamicObjectClient {
    async fn list(&self, namespace: &str, kind: &RequiredResourceKind) -> Result<Vec<DynamicObject>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &kind.api_resource());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::namespace_fetch(namespace, kind.kind, e.to_string()))?;
        debug!(namespace, kind = kind.kind, count = list.items.len(), "Listed objects");
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde::Deserialize;
    use serde_json::json;

    const WIDGET: RequiredResourceKind =
        RequiredResourceKind::new("Widget", "example.io", "v1", "widgets");

    #[derive(Debug, Deserialize, PartialEq)]
    struct WidgetSpec {
        size: u32,
    }

    #[derive(Debug, Deserialize)]
    struct Widget {
        metadata: ObjectMeta,
        spec: WidgetSpec,
    }

    fn widget(name: &str, size: serde_json::Value) -> DynamicObject {
        DynamicObject::new(name, &WIDGET.api_resource())
            .within("team-a")
            .data(json!({ "spec": { "size": size } }))
    }

    #[test]
    fn test_dynamic_list_keeps_objects() {
        let mut list: Vec<DynamicObject> = Vec::new();
        list.extend_dynamic(vec![widget("w1", json!(1)), widget("w2", json!(2))])
            .unwrap();
        assert_eq!(ObjectList::len(&list), 2);
        assert_eq!(list[1].metadata.name.as_deref(), Some("w2"));
    }

    #[test]
    fn test_typed_list_decodes_objects() {
        let mut list = TypedList::<Widget>::new();
        list.extend_dynamic(vec![widget("w1", json!(3))]).unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.items[0].metadata.name.as_deref(), Some("w1"));
        assert_eq!(list.items[0].metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(list.items[0].spec, WidgetSpec { size: 3 });
    }

    #[test]
    fn test_typed_list_reports_undecodable_object() {
        let mut list = TypedList::<Widget>::new();
        let err = list
            .extend_dynamic(vec![widget("bad", json!("not-a-number"))])
            .unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_empty_lists() {
        assert!(TypedList::<Widget>::default().is_empty());
        assert!(ObjectList::is_empty(&Vec::<DynamicObject>::new()));
    }
}
