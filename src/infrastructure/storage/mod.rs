mod blob_store_factory;
mod object_blob_store;
mod url_signer;

pub use blob_store_factory::BlobStoreFactory;
pub use object_blob_store::ObjectBlobStore;
pub use url_signer::UrlSigner;
