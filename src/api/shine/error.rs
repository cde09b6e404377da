use thiserror::Error;

/// Everything that can go wrong while talking to the Shine cloud.
///
/// Extraction and authentication failures abort a whole polling cycle;
/// snapshot failures are per-device and only skip the affected device.
#[derive(Debug, Error)]
pub enum Error {
    #[error("public key extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("bad device snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The scraped front-end no longer matches the expected patterns,
/// most likely because the vendor shipped a new web app build.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no versioned `index.*.js` reference in the login page head")]
    MissingScriptReference,

    #[error("no `setPublicKey(…)` call in the scraped bundles")]
    MissingSetPublicKeyCall,

    #[error("no string assignment to `{variable}` in the scraped bundles")]
    MissingKeyAssignment { variable: String },
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("the login response is missing the token")]
    MissingToken,

    #[error("malformed bearer token: {0}")]
    MalformedToken(&'static str),

    #[error("the extracted public key does not parse as PEM SPKI")]
    InvalidPublicKey(#[source] rsa::pkcs8::spki::Error),

    #[error("password encryption failed")]
    EncryptionFailed(#[source] rsa::Error),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("the snapshot response is missing the `data` envelope")]
    MissingEnvelope,

    #[error("the snapshot is missing the `productTypeEnum` discriminator")]
    MissingDeviceType,

    #[error("unsupported device type `{0}`")]
    UnknownDeviceType(String),
}
