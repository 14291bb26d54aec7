//! Maps upstream records onto local identifiers and decides, per record,
//! whether to create, update or skip it.
//!
//! Parents are joined on their external id. Variants are joined on their
//! business key (EAN), which is globally unique: a key already owned by a
//! different parent is never reassigned. Within one run the first record to
//! claim a key wins, in processing order.

use std::collections::{HashMap, HashSet};

use pimsync_core::{CatalogProduct, CatalogVariant};
use pimsync_upstream::{CostPriceLookup, VariantSnapshot};
use rust_decimal::Decimal;

/// Why a candidate, or one dependent write of it, was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The product has no variants upstream.
    NoVariants,
    /// Every variant of the product conflicts with an existing claim.
    DuplicateKey,
    /// One variant was dropped from an otherwise written product.
    VariantDuplicateKey,
    /// A variant has prices but no business key to store them under.
    PriceMissingBusinessKey,
    NotFoundUpstream,
    NoCostPrice,
    /// Upstream has several records for one business key.
    AmbiguousUpstream,
    /// Upstream attaches the key to a different parent than the local catalog.
    OwnedByOtherParent,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::NoVariants => "no_variants",
            SkipReason::DuplicateKey => "duplicate_key",
            SkipReason::VariantDuplicateKey => "variant_duplicate_key",
            SkipReason::PriceMissingBusinessKey => "price_missing_business_key",
            SkipReason::NotFoundUpstream => "not_found_upstream",
            SkipReason::NoCostPrice => "no_cost_price",
            SkipReason::AmbiguousUpstream => "ambiguous_upstream",
            SkipReason::OwnedByOtherParent => "owned_by_other_parent",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a business-key claim came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Owned by a row that existed when the run started.
    Store,
    /// Claimed earlier in the current run.
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// External id of the owning parent.
    pub parent: i64,
    pub origin: Origin,
}

/// Running set of claimed business keys, seeded from the store.
#[derive(Debug, Clone, Default)]
pub struct ClaimedKeys {
    claims: HashMap<String, Claim>,
}

impl ClaimedKeys {
    pub fn seed<I>(owners: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let claims = owners
            .into_iter()
            .map(|(key, parent)| {
                (
                    key,
                    Claim {
                        parent,
                        origin: Origin::Store,
                    },
                )
            })
            .collect();
        Self { claims }
    }

    #[must_use]
    pub fn owner(&self, key: &str) -> Option<Claim> {
        self.claims.get(key).copied()
    }

    /// Claims `key` for `parent`. A key already held by the same parent is
    /// re-claimed; a key held by another parent is refused with that claim.
    ///
    /// # Errors
    ///
    /// Returns the existing [`Claim`] when another parent owns the key.
    pub fn claim(&mut self, key: &str, parent: i64) -> Result<(), Claim> {
        match self.claims.get(key) {
            Some(existing) if existing.parent != parent => Err(*existing),
            Some(_) => Ok(()),
            None => {
                self.claims.insert(
                    key.to_owned(),
                    Claim {
                        parent,
                        origin: Origin::Run,
                    },
                );
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

/// A variant refused because its key belongs to someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConflict {
    pub key: String,
    pub owner: Claim,
    pub incoming_parent: i64,
    pub incoming_variant: i64,
    pub title: String,
}

impl std::fmt::Display for KeyConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match self.owner.origin {
            Origin::Store => "existing",
            Origin::Run => "this run",
        };
        write!(
            f,
            "EAN {} on variant {} of \"{}\" (product {}) already claimed by product {} ({origin})",
            self.key, self.incoming_variant, self.title, self.incoming_parent, self.owner.parent
        )
    }
}

/// A product accepted for writing. `product.variants` holds only the
/// variants that survived conflict checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPlan {
    pub product: CatalogProduct,
    /// Variants dropped from the write set.
    pub conflicts: Vec<KeyConflict>,
}

impl ProductPlan {
    /// Number of kept variants whose prices cannot be written for lack of a
    /// business key.
    #[must_use]
    pub fn unkeyed_priced_variants(&self) -> usize {
        self.product
            .variants
            .iter()
            .filter(|v| v.business_key().is_none() && !v.prices.is_empty())
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WritePlan {
    /// Parent upsert, replace-all children, replace-for-key prices.
    Product(ProductPlan),
    /// In-place update of the local variant owning `key`, plus its prices.
    Variant { key: String, variant: CatalogVariant },
    BuyPrice {
        key: String,
        cost_price: Decimal,
        warehouse_product_id: Option<i64>,
    },
}

impl WritePlan {
    /// Locates the record in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            WritePlan::Product(plan) => format!(
                "product {} (\"{}\")",
                plan.product.external_id, plan.product.title
            ),
            WritePlan::Variant { key, .. } | WritePlan::BuyPrice { key, .. } => {
                format!("EAN {key}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Create(WritePlan),
    Update(WritePlan),
    SkipDuplicate {
        samples: Vec<String>,
        reason: SkipReason,
    },
    SkipIncomplete {
        reason: SkipReason,
    },
}

impl Decision {
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Decision::Create(_) | Decision::Update(_))
    }
}

pub struct Reconciler {
    claims: ClaimedKeys,
    known_parents: HashSet<i64>,
}

impl Reconciler {
    pub fn new(claims: ClaimedKeys, known_parents: impl IntoIterator<Item = i64>) -> Self {
        Self {
            claims,
            known_parents: known_parents.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn claims(&self) -> &ClaimedKeys {
        &self.claims
    }

    /// Classifies one enriched product and claims the keys of every variant
    /// it keeps.
    pub fn reconcile_product(&mut self, mut product: CatalogProduct) -> Decision {
        if product.variants.is_empty() {
            tracing::debug!(external_id = product.external_id, "no variants, skipping");
            return Decision::SkipIncomplete {
                reason: SkipReason::NoVariants,
            };
        }

        let parent = product.external_id;
        let mut seen_in_parent: HashSet<String> = HashSet::new();
        let mut conflicts = Vec::new();
        let mut kept = Vec::with_capacity(product.variants.len());

        for variant in std::mem::take(&mut product.variants) {
            let Some(key) = variant.business_key().map(str::to_owned) else {
                kept.push(variant);
                continue;
            };

            let refused = if seen_in_parent.contains(&key) {
                Some(Claim {
                    parent,
                    origin: Origin::Run,
                })
            } else {
                self.claims.claim(&key, parent).err()
            };

            match refused {
                Some(owner) => conflicts.push(KeyConflict {
                    key,
                    owner,
                    incoming_parent: parent,
                    incoming_variant: variant.external_id,
                    title: product.title.clone(),
                }),
                None => {
                    seen_in_parent.insert(key);
                    kept.push(variant);
                }
            }
        }

        if kept.is_empty() {
            tracing::debug!(external_id = parent, conflicts = conflicts.len(), "all variants conflict");
            return Decision::SkipDuplicate {
                samples: conflicts.iter().map(ToString::to_string).collect(),
                reason: SkipReason::DuplicateKey,
            };
        }

        product.variants = kept;
        let plan = WritePlan::Product(ProductPlan { product, conflicts });

        if self.known_parents.insert(parent) {
            tracing::debug!(external_id = parent, "create");
            Decision::Create(plan)
        } else {
            tracing::debug!(external_id = parent, "update");
            Decision::Update(plan)
        }
    }

    /// Classifies the upstream variants found for one local business key.
    pub fn reconcile_key(&self, key: &str, snapshots: Vec<VariantSnapshot>) -> Decision {
        let mut parents: Vec<i64> = snapshots
            .iter()
            .filter_map(|s| s.product_external_id)
            .collect();
        parents.sort_unstable();
        parents.dedup();

        if parents.len() > 1 {
            return Decision::SkipDuplicate {
                samples: vec![format!(
                    "EAN {key} is carried by several upstream products: {parents:?}"
                )],
                reason: SkipReason::AmbiguousUpstream,
            };
        }

        let Some(snapshot) = snapshots.into_iter().next() else {
            return Decision::SkipIncomplete {
                reason: SkipReason::NotFoundUpstream,
            };
        };

        if let (Some(upstream_parent), Some(local)) =
            (snapshot.product_external_id, self.claims.owner(key))
        {
            if upstream_parent != local.parent {
                return Decision::SkipDuplicate {
                    samples: vec![format!(
                        "EAN {key} belongs to upstream product {upstream_parent} but local product {}",
                        local.parent
                    )],
                    reason: SkipReason::OwnedByOtherParent,
                };
            }
        }

        Decision::Update(WritePlan::Variant {
            key: key.to_owned(),
            variant: snapshot.variant,
        })
    }
}

/// Classifies one warehouse cost-price lookup.
#[must_use]
pub fn reconcile_buy_price(key: &str, lookup: CostPriceLookup) -> Decision {
    match lookup {
        CostPriceLookup::Found {
            product_id,
            cost_price,
        } => Decision::Update(WritePlan::BuyPrice {
            key: key.to_owned(),
            cost_price,
            warehouse_product_id: Some(product_id),
        }),
        CostPriceLookup::MissingCostPrice { .. } => Decision::SkipIncomplete {
            reason: SkipReason::NoCostPrice,
        },
        CostPriceLookup::NotFound => Decision::SkipIncomplete {
            reason: SkipReason::NotFoundUpstream,
        },
        CostPriceLookup::Ambiguous { product_ids } => Decision::SkipDuplicate {
            samples: vec![format!(
                "EAN {key} matches several warehouse products: {product_ids:?}"
            )],
            reason: SkipReason::AmbiguousUpstream,
        },
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
