//! HTTP client for the SiYuan kernel API.
//!
//! Every endpoint is a `POST` with a JSON body and answers with
//! `{"code": 0, "msg": "", "data": ...}`.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::api::{ChildBlock, Notebook, SiyuanApi};

const SERVICE: &str = "SiYuan";

/// Notification display time in milliseconds.
const MSG_TIMEOUT_MS: u64 = 7000;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct NotebookList {
    notebooks: Vec<Notebook>,
}

#[derive(Debug, Deserialize)]
struct NotebookConfData {
    conf: NotebookConf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotebookConf {
    #[serde(default)]
    daily_note_save_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transaction {
    do_operations: Vec<Operation>,
}

#[derive(Debug, Deserialize)]
struct Operation {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertBlockRequest<'a> {
    data_type: &'static str,
    data: &'a str,
    #[serde(rename = "previousID")]
    previous_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendBlockRequest<'a> {
    data_type: &'static str,
    data: &'a str,
    #[serde(rename = "parentID")]
    parent_id: &'a str,
}

/// SiYuan kernel client authenticated with an API token.
pub struct SiyuanClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SiyuanClient {
    /// Create a client for `base_url` (a trailing `/` is tolerated).
    #[must_use]
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{endpoint}", self.base_url));
        if self.token.is_empty() {
            request
        } else {
            request.header("Authorization", format!("Token {}", self.token))
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>> {
        trace!(endpoint, "SiYuan request");

        let response = request.send().await.map_err(|source| Error::Request {
            service: SERVICE,
            source,
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized { service: SERVICE });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let body: ApiResponse<T> = response.json().await.map_err(|source| Error::Request {
            service: SERVICE,
            source,
        })?;

        if body.code != 0 {
            debug!(endpoint, code = body.code, msg = %body.msg, "SiYuan API rejected request");
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                code: body.code,
                msg: body.msg,
            });
        }
        Ok(body.data)
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &impl Serialize,
    ) -> Result<Option<T>> {
        self.call(endpoint, self.post(endpoint).json(payload)).await
    }

    fn missing_data(endpoint: &str) -> Error {
        Error::Api {
            endpoint: endpoint.to_string(),
            code: 0,
            msg: "response carried no data".to_string(),
        }
    }

    /// First `doOperations` id of a block transaction response.
    fn created_block_id(endpoint: &str, data: Option<Vec<Transaction>>) -> Result<String> {
        data.and_then(|txs| txs.into_iter().next())
            .and_then(|tx| tx.do_operations.into_iter().next())
            .map(|op| op.id)
            .ok_or_else(|| Self::missing_data(endpoint))
    }
}

impl SiyuanApi for SiyuanClient {
    async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        const EP: &str = "/api/notebook/lsNotebooks";
        let data: Option<NotebookList> = self.call_json(EP, &json!({})).await?;
        Ok(data.map(|d| d.notebooks).unwrap_or_default())
    }

    async fn daily_note_template(&self, notebook: &str) -> Result<String> {
        const EP: &str = "/api/notebook/getNotebookConf";
        let data: Option<NotebookConfData> =
            self.call_json(EP, &json!({ "notebook": notebook })).await?;
        data.map(|d| d.conf.daily_note_save_path)
            .ok_or_else(|| Self::missing_data(EP))
    }

    async fn render_sprig(&self, template: &str) -> Result<String> {
        const EP: &str = "/api/template/renderSprig";
        let data: Option<String> = self.call_json(EP, &json!({ "template": template })).await?;
        data.ok_or_else(|| Self::missing_data(EP))
    }

    async fn ids_by_hpath(&self, notebook: &str, hpath: &str) -> Result<Vec<String>> {
        const EP: &str = "/api/filetree/getIDsByHPath";
        let data: Option<Vec<String>> = self
            .call_json(EP, &json!({ "notebook": notebook, "path": hpath }))
            .await?;
        Ok(data.unwrap_or_default())
    }

    async fn create_doc_with_md(&self, notebook: &str, hpath: &str, markdown: &str) -> Result<String> {
        const EP: &str = "/api/filetree/createDocWithMd";
        let data: Option<String> = self
            .call_json(
                EP,
                &json!({ "notebook": notebook, "path": hpath, "markdown": markdown }),
            )
            .await?;
        data.ok_or_else(|| Self::missing_data(EP))
    }

    async fn append_block(&self, parent_id: &str, markdown: &str) -> Result<String> {
        const EP: &str = "/api/block/appendBlock";
        let request = AppendBlockRequest {
            data_type: "markdown",
            data: markdown,
            parent_id,
        };
        let data: Option<Vec<Transaction>> = self.call_json(EP, &request).await?;
        Self::created_block_id(EP, data)
    }

    async fn insert_block_after(&self, previous_id: &str, markdown: &str) -> Result<String> {
        const EP: &str = "/api/block/insertBlock";
        let request = InsertBlockRequest {
            data_type: "markdown",
            data: markdown,
            previous_id,
        };
        let data: Option<Vec<Transaction>> = self.call_json(EP, &request).await?;
        Self::created_block_id(EP, data)
    }

    async fn child_blocks(&self, id: &str) -> Result<Vec<ChildBlock>> {
        const EP: &str = "/api/block/getChildBlocks";
        let data: Option<Vec<ChildBlock>> = self.call_json(EP, &json!({ "id": id })).await?;
        Ok(data.unwrap_or_default())
    }

    async fn delete_block(&self, id: &str) -> Result<()> {
        const EP: &str = "/api/block/deleteBlock";
        let _: Option<serde_json::Value> = self.call_json(EP, &json!({ "id": id })).await?;
        Ok(())
    }

    async fn set_block_attrs(&self, id: &str, attrs: &BTreeMap<String, String>) -> Result<()> {
        const EP: &str = "/api/attr/setBlockAttrs";
        let _: Option<serde_json::Value> = self
            .call_json(EP, &json!({ "id": id, "attrs": attrs }))
            .await?;
        Ok(())
    }

    async fn query_sql(&self, stmt: &str) -> Result<Vec<serde_json::Value>> {
        const EP: &str = "/api/query/sql";
        let data: Option<Vec<serde_json::Value>> =
            self.call_json(EP, &json!({ "stmt": stmt })).await?;
        Ok(data.unwrap_or_default())
    }

    async fn put_file(&self, path: &str, content: Vec<u8>) -> Result<()> {
        const EP: &str = "/api/file/putFile";
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        let form = reqwest::multipart::Form::new()
            .text("path", path.to_string())
            .text("isDir", "false")
            .part(
                "file",
                reqwest::multipart::Part::bytes(content).file_name(filename),
            );
        let _: Option<serde_json::Value> = self.call(EP, self.post(EP).multipart(form)).await?;
        Ok(())
    }

    async fn push_msg(&self, msg: &str) -> Result<()> {
        const EP: &str = "/api/notification/pushMsg";
        let _: Option<serde_json::Value> = self
            .call_json(EP, &json!({ "msg": msg, "timeout": MSG_TIMEOUT_MS }))
            .await?;
        Ok(())
    }

    async fn push_err_msg(&self, msg: &str) -> Result<()> {
        const EP: &str = "/api/notification/pushErrMsg";
        let _: Option<serde_json::Value> = self
            .call_json(EP, &json!({ "msg": msg, "timeout": MSG_TIMEOUT_MS }))
            .await?;
        Ok(())
    }
}
