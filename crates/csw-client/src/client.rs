//! CSW catalogue client built on the generic OWS client core.

use ows_common::namespaces::GMD;
use ows_common::QName;
use ows_protocol::{
    CapabilitiesDocument, ClientConfig, HttpTransport, OwsClient, OwsError, OwsResult,
    ReqwestTransport, Url,
};
use ows_query::{AdHocQuery, Filter};
use tracing::{debug, instrument};

use crate::codec::CswCodec;
use crate::constants::{
    ElementSetName, ResultType, ISO_MAX_RECORDS, ISO_START_POSITION, OUTPUT_FORMAT_XML,
    OUTPUT_SCHEMA_ISO,
};
use crate::get_records::GetRecords;
use crate::response::GetRecordsResponse;
use crate::transaction::{TransactionInsert, TransactionResponse};

/// A connected catalogue.
///
/// Searches go out even when the capabilities do not list `GetRecords` and the
/// service decides. Inserts require an advertised `Transaction` operation.
pub struct CswClient<T = ReqwestTransport> {
    inner: OwsClient<CswCodec, T>,
}

impl CswClient<ReqwestTransport> {
    /// Fetch the capabilities at `url` and build a client over reqwest.
    pub async fn connect(url: Url, config: &ClientConfig) -> OwsResult<Self> {
        let inner = OwsClient::connect(url, CswCodec, config).await?;
        Ok(Self { inner })
    }
}

impl<T: HttpTransport> CswClient<T> {
    pub async fn with_transport(url: Url, transport: T) -> OwsResult<Self> {
        let inner = OwsClient::with_transport(url, CswCodec, transport).await?;
        Ok(Self { inner })
    }

    pub fn inner(&self) -> &OwsClient<CswCodec, T> {
        &self.inner
    }

    pub fn capabilities(&self) -> &CapabilitiesDocument {
        self.inner.capabilities()
    }

    /// Run a search exactly as described by `request`.
    pub async fn get_records(&self, request: &GetRecords) -> OwsResult<GetRecordsResponse> {
        self.inner.execute(request).await
    }

    /// Search with an ad-hoc query. Type names, projection, constraint and
    /// sort order come from the query.
    pub async fn search(
        &self,
        query: &AdHocQuery,
        start_position: u32,
        max_records: u32,
        output_schema: &str,
        result_type: ResultType,
    ) -> OwsResult<GetRecordsResponse> {
        let request = GetRecords::from_query(
            query,
            start_position,
            max_records,
            OUTPUT_FORMAT_XML,
            output_schema,
            result_type,
        );
        self.get_records(&request).await
    }

    /// ISO 19139 records (`gmd:MD_Metadata`) in the standard window.
    pub async fn get_iso_records(
        &self,
        result_type: ResultType,
        element_set: ElementSetName,
        constraint: Option<Filter>,
    ) -> OwsResult<GetRecordsResponse> {
        self.get_iso_records_window(
            ISO_START_POSITION,
            ISO_MAX_RECORDS,
            result_type,
            element_set,
            constraint,
        )
        .await
    }

    pub async fn get_iso_records_window(
        &self,
        start_position: u32,
        max_records: u32,
        result_type: ResultType,
        element_set: ElementSetName,
        constraint: Option<Filter>,
    ) -> OwsResult<GetRecordsResponse> {
        let request = GetRecords::new(
            start_position,
            max_records,
            OUTPUT_FORMAT_XML,
            OUTPUT_SCHEMA_ISO,
            vec![QName::new(GMD, "MD_Metadata", "gmd")],
            result_type,
            element_set,
            constraint,
        );
        self.get_records(&request).await
    }

    /// Insert one record document.
    pub async fn insert(&self, record: impl AsRef<[u8]>) -> OwsResult<TransactionResponse> {
        self.insert_all([record]).await
    }

    /// Insert several record documents in a single transaction.
    #[instrument(skip(self, records))]
    pub async fn insert_all<I, B>(&self, records: I) -> OwsResult<TransactionResponse>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        // Checked before the records are validated so an unsupported service
        // is reported as such whatever the input.
        self.inner.check_operation_supported("Transaction")?;
        let request = TransactionInsert::new(records)?;
        debug!(
            request_id = request.request_id(),
            records = request.records().len(),
            "Inserting records"
        );
        self.inner.execute(&request).await
    }

    pub async fn update(&self, _record: impl AsRef<[u8]>) -> OwsResult<TransactionResponse> {
        Err(OwsError::NotImplemented {
            operation: "Transaction/Update",
        })
    }

    pub async fn delete(&self, _identifier: &str) -> OwsResult<TransactionResponse> {
        Err(OwsError::NotImplemented {
            operation: "Transaction/Delete",
        })
    }

    pub async fn delete_matching(&self, _constraint: &Filter) -> OwsResult<TransactionResponse> {
        Err(OwsError::NotImplemented {
            operation: "Transaction/Delete",
        })
    }

    pub async fn delete_all(&self) -> OwsResult<TransactionResponse> {
        Err(OwsError::NotImplemented {
            operation: "Transaction/Delete",
        })
    }

    pub async fn get_record_by_id(&self, _identifier: &str) -> OwsResult<GetRecordsResponse> {
        Err(OwsError::NotImplemented {
            operation: "GetRecordById",
        })
    }
}
