use crate::domain::errors::ModuleError;

/// Maps logical schema/table/column names to paths inside an archive being read
pub trait ContentPathImportStrategy: Send + Sync {
    fn associate_schema_with_folder(&mut self, schema_name: &str, schema_folder: &str);

    fn associate_table_with_folder(&mut self, table_id: &str, table_folder: &str);

    fn associate_column_with_folder(&mut self, column_id: &str, column_folder: &str);

    /// `content/<schemaFolder>/<tableFolder>/<tableFolder>.xml`
    fn table_xml_file_path(&self, schema_name: &str, table_id: &str)
        -> Result<String, ModuleError>;

    /// `content/<schemaFolder>/<tableFolder>/<tableFolder>.xsd`
    fn table_xsd_file_path(&self, schema_name: &str, table_id: &str)
        -> Result<String, ModuleError>;

    /// `<basePath>/<schemaFolder|.>/<tableFolder|.>/<columnFolder|.>/<fileName>`
    fn lob_path(
        &self,
        base_path: Option<&str>,
        schema_name: &str,
        table_id: &str,
        column_id: &str,
        file_name: &str,
    ) -> String;
}

/// Maps schema/table/column/row positions to paths inside an archive being written
pub trait ContentPathExportStrategy: Send + Sync {
    fn schema_folder_name(&self, schema_index: usize) -> String;

    fn table_folder_name(&self, table_index: usize) -> String;

    fn column_folder_name(&self, column_index: usize) -> String;

    fn clob_file_name(&self, row_index: u64) -> String;

    fn blob_file_name(&self, row_index: u64) -> String;

    fn clob_file_path(
        &self,
        schema_index: usize,
        table_index: usize,
        column_index: usize,
        row_index: u64,
    ) -> String;

    fn blob_file_path(
        &self,
        schema_index: usize,
        table_index: usize,
        column_index: usize,
        row_index: u64,
    ) -> String;

    fn table_xml_file_path(&self, schema_index: usize, table_index: usize) -> String;

    fn table_xsd_file_path(&self, schema_index: usize, table_index: usize) -> String;

    fn table_xsd_namespace(&self, base: &str, schema_index: usize, table_index: usize) -> String;

    fn table_xsd_file_name(&self, table_index: usize) -> String;
}
