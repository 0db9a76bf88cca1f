use crate::adapters::object_reader::ObjectReader;

pub struct S3ObjectReader {
    client: aws_sdk_s3::Client,
}

impl S3ObjectReader {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectReader for S3ObjectReader {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read report object: {error}"))?;

                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(|error| format!("failed to buffer report object body: {error}"))?;

                Ok(body.into_bytes().to_vec())
            })
        })
    }
}
