use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::persistence::{InvoiceRepository, StoreError, StoreResult, WorkspaceRepository};
use crate::workspace::attribute_actor;
use crate::{InvoiceItem, NewAsset, ReconciliationResult};

/// Links asset-type invoice items to asset records.
///
/// Unlinked items of an invoice are paired, in sort order, with the invoice's
/// assets that no item claims yet. Items left over after pairing get a new
/// asset each. A half-linked invoice therefore completes without duplicating
/// the assets it already has.
pub struct AssetLinker<'a> {
    invoices: &'a dyn InvoiceRepository,
    workspaces: &'a dyn WorkspaceRepository,
}

impl<'a> AssetLinker<'a> {
    pub fn new(invoices: &'a dyn InvoiceRepository, workspaces: &'a dyn WorkspaceRepository) -> Self {
        Self {
            invoices,
            workspaces,
        }
    }

    pub fn run_pending(&self) -> StoreResult<ReconciliationResult> {
        let items = self.invoices.unlinked_asset_items()?;
        debug!(count = items.len(), "loaded unlinked asset items");
        Ok(self.run(items))
    }

    /// `updated` counts items linked to an existing asset, `created` counts
    /// assets created for the remainder.
    pub fn run(&self, items: impl IntoIterator<Item = InvoiceItem>) -> ReconciliationResult {
        let mut by_invoice: BTreeMap<i64, Vec<InvoiceItem>> = BTreeMap::new();
        let mut result = ReconciliationResult::default();
        for item in items {
            if item.asset_id.is_some() || !item.is_asset() {
                result.skipped += 1;
                continue;
            }
            by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        for (invoice_id, mut items) in by_invoice {
            items.sort_by_key(|item| (item.sort_order, item.id));
            let invoice_result = self.link_invoice(invoice_id, &items);
            if invoice_result.has_errors() {
                warn!(invoice = invoice_id, errors = invoice_result.errors.len(), "invoice linking incomplete");
            }
            result.merge(invoice_result);
        }
        result
    }

    fn link_invoice(&self, invoice_id: i64, items: &[InvoiceItem]) -> ReconciliationResult {
        let mut result = ReconciliationResult::default();
        let prepared = self.invoices.find_invoice(invoice_id).and_then(|invoice| {
            let invoice = invoice.ok_or_else(|| StoreError::not_found("invoice", invoice_id))?;
            let existing = self.invoices.unclaimed_assets_for_invoice(invoice_id)?;
            Ok((invoice, existing))
        });
        let (invoice, existing) = match prepared {
            Ok(found) => found,
            Err(err) => {
                for item in items {
                    result.record_error(format!("invoice {invoice_id} item {}: {err}", item.id));
                }
                return result;
            }
        };

        let mut existing = existing.into_iter();
        let mut actor: Option<Option<i64>> = None;
        for item in items {
            let linked = match existing.next() {
                Some(asset) => self
                    .invoices
                    .link_item_to_asset(item.id, asset.id)
                    .map(|()| (asset.id, false)),
                None => {
                    let created_by = match actor {
                        Some(cached) => cached,
                        None => {
                            let resolved = self.resolve_actor(invoice.workspace_id, invoice.created_by);
                            actor = Some(resolved);
                            resolved
                        }
                    };
                    self.invoices
                        .create_asset(NewAsset::from_invoice_item(&invoice, item, created_by))
                        .and_then(|asset| {
                            self.invoices
                                .link_item_to_asset(item.id, asset.id)
                                .map(|()| (asset.id, true))
                        })
                }
            };
            match linked {
                Ok((asset_id, true)) => {
                    info!(invoice = invoice.id, item = item.id, asset = asset_id, "created asset from invoice item");
                    result.created += 1;
                }
                Ok((asset_id, false)) => {
                    debug!(invoice = invoice.id, item = item.id, asset = asset_id, "linked existing asset");
                    result.updated += 1;
                }
                Err(err) => {
                    result.record_error(format!("invoice {} item {}: {err}", invoice.id, item.id));
                }
            }
        }
        result
    }

    // Asset attribution is informational; an unknown workspace leaves it blank
    // rather than blocking the link.
    fn resolve_actor(&self, workspace_id: i64, created_by: Option<i64>) -> Option<i64> {
        match self.workspaces.find_workspace(workspace_id) {
            Ok(Some(workspace)) => attribute_actor(created_by, &workspace),
            Ok(None) => created_by,
            Err(err) => {
                warn!(workspace = workspace_id, error = %err, "could not load workspace for attribution");
                created_by
            }
        }
    }
}
