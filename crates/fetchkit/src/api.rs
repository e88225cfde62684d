//! Verb shorthands over `send_request`

use serde::Serialize;
use serde::de::DeserializeOwned;
use transport::HttpMethod;

use crate::client::Client;
use crate::error::Result;
use crate::pipeline::RequestOptions;

impl Client {
    pub async fn get<T: DeserializeOwned>(&self, url: &str, options: RequestOptions) -> Result<T> {
        self.send_request::<T, ()>(HttpMethod::Get, url, options, None)
            .await
    }

    pub async fn post<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_request(HttpMethod::Post, url, options, Some(body))
            .await
    }

    pub async fn put<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_request(HttpMethod::Put, url, options, Some(body))
            .await
    }

    pub async fn patch<T, B>(&self, url: &str, body: &B, options: RequestOptions) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_request(HttpMethod::Patch, url, options, Some(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T> {
        self.send_request::<T, ()>(HttpMethod::Delete, url, options, None)
            .await
    }
}
