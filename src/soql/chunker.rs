use crate::soql::SoqlQuery;

/// Default serialized-filter length budget, sized against transport URL
/// limits rather than row counts
pub const DEFAULT_FILTER_LENGTH_BUDGET: usize = 3900;

/// One chunked query together with the field whose values drive its filter,
/// so results can be regrouped by that field afterward
#[derive(Debug, Clone)]
pub struct ChunkedQuery {
    pub driving_field: String,
    pub query: SoqlQuery,
}

/// Rebuild a query's filter as `field IN (<batch>)` clauses, chunked by a
/// maximum serialized filter length. The original WHERE body is replaced;
/// projection and object carry over.
pub fn chunk_in_queries(
    base: &SoqlQuery,
    field: &str,
    values: &[String],
    max_filter_len: usize,
) -> Vec<ChunkedQuery> {
    let mut chunks = Vec::new();
    if values.is_empty() {
        return chunks;
    }

    let prefix_len = field.len() + " IN ()".len();
    let mut batch: Vec<String> = Vec::new();
    let mut batch_len = prefix_len;

    let flush = |batch: &mut Vec<String>, chunks: &mut Vec<ChunkedQuery>| {
        if batch.is_empty() {
            return;
        }
        let literals: Vec<String> = batch
            .iter()
            .map(|v| format!("'{}'", v.replace('\'', "\\'")))
            .collect();
        let mut query = base.clone();
        query.where_clause = Some(format!("{} IN ({})", field, literals.join(",")));
        query.limit = None;
        chunks.push(ChunkedQuery {
            driving_field: field.to_string(),
            query,
        });
        batch.clear();
    };

    for value in values {
        // quoted literal plus separator
        let added = value.len() + 3;
        if !batch.is_empty() && batch_len + added > max_filter_len {
            flush(&mut batch, &mut chunks);
            batch_len = prefix_len;
        }
        batch_len += added;
        batch.push(value.clone());
    }
    flush(&mut batch, &mut chunks);

    chunks
}
