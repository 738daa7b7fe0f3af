//! Progressive tiered tariff with fixed charge and tax.

use std::fmt;

use serde::Serialize;

/// One progressive price band.
///
/// Bands are cumulative: a band covers consumption from the previous band's
/// `up_to_kwh` (or zero) up to its own `up_to_kwh`. The last band is
/// open-ended (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierBand {
    /// Upper cumulative bound of the band (kWh), `None` for the last band.
    pub up_to_kwh: Option<f64>,
    /// Price per kWh within this band.
    pub rate: f64,
}

/// Quantity and cost charged in one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierCharge {
    /// Lower cumulative bound of the band (kWh).
    pub from_kwh: f64,
    /// Upper cumulative bound of the band (kWh), `None` when open-ended.
    pub up_to_kwh: Option<f64>,
    /// kWh billed in this band.
    pub quantity_kwh: f64,
    /// Price per kWh.
    pub rate: f64,
    /// `quantity_kwh * rate`.
    pub cost: f64,
}

/// Why only the fixed charge was billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FixedReason {
    /// Net consumption was zero or negative.
    NonPositiveNet,
    /// Positive net consumption was fully offset by credit.
    CoveredByCredit,
}

/// Output of costing one net-energy value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TariffBreakdown {
    /// Net energy that was priced (kWh, signed).
    pub net_kwh: f64,
    /// Per-band charges; empty when only the fixed charge applies.
    pub tiers: Vec<TierCharge>,
    /// Amount before tax.
    pub subtotal: f64,
    /// Tax on the subtotal.
    pub tax: f64,
    /// `subtotal + tax`.
    pub total: f64,
    /// Set when the fixed charge replaced the tiered cost.
    pub fixed_reason: Option<FixedReason>,
}

impl TariffBreakdown {
    /// Human-readable breakdown of what was billed.
    pub fn detail(&self) -> String {
        match self.fixed_reason {
            Some(FixedReason::NonPositiveNet) => format!(
                "fixed charge ${:.2}, non-positive net consumption",
                self.subtotal
            ),
            Some(FixedReason::CoveredByCredit) => format!(
                "fixed charge ${:.2}, consumption covered by credit balance",
                self.subtotal
            ),
            None => {
                let parts: Vec<String> = self
                    .tiers
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let range = match t.up_to_kwh {
                            Some(up) => format!("{:.0}-{:.0}", t.from_kwh, up),
                            None => format!(">{:.0}", t.from_kwh),
                        };
                        format!(
                            "tier {} ({range}): {:.2} kWh x ${:.2} = ${:.2}",
                            i + 1,
                            t.quantity_kwh,
                            t.rate,
                            t.cost
                        )
                    })
                    .collect();
                parts.join("; ")
            }
        }
    }
}

impl fmt::Display for TariffBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | subtotal=${:.2} tax=${:.2} total=${:.2}",
            self.detail(),
            self.subtotal,
            self.tax,
            self.total
        )
    }
}

/// Tiered tariff schedule: fixed charge for non-positive net, progressive
/// bands otherwise, tax on whichever subtotal applies.
///
/// # Examples
///
/// ```
/// use bimestre::billing::tariff::Tariff;
///
/// let tariff = Tariff::default();
/// let bill = tariff.cost(250.0);
/// assert!((bill.subtotal - 274.50).abs() < 1e-9);
/// assert!((bill.total - 318.42).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tariff {
    /// Charge billed when no tiered consumption applies, before tax.
    pub fixed_charge: f64,
    /// Tax rate applied to the subtotal (0.16 = 16%).
    pub tax_rate: f64,
    /// Progressive bands in ascending order.
    pub bands: Vec<TierBand>,
}

impl Default for Tariff {
    /// Domestic three-band schedule: 1.01 up to 150 kWh, 1.23 up to 350 kWh,
    /// 3.62 above; fixed charge 127.00; 16% tax.
    fn default() -> Self {
        Self {
            fixed_charge: 127.0,
            tax_rate: 0.16,
            bands: vec![
                TierBand {
                    up_to_kwh: Some(150.0),
                    rate: 1.01,
                },
                TierBand {
                    up_to_kwh: Some(350.0),
                    rate: 1.23,
                },
                TierBand {
                    up_to_kwh: None,
                    rate: 3.62,
                },
            ],
        }
    }
}

impl Tariff {
    /// Creates a tariff from explicit parameters.
    pub fn new(fixed_charge: f64, tax_rate: f64, bands: Vec<TierBand>) -> Self {
        Self {
            fixed_charge,
            tax_rate,
            bands,
        }
    }

    /// Prices a net-energy value.
    ///
    /// Non-positive net bills the fixed charge; positive net is split across
    /// the bands in order.
    pub fn cost(&self, net_kwh: f64) -> TariffBreakdown {
        if net_kwh <= 0.0 {
            return self.fixed(net_kwh, FixedReason::NonPositiveNet);
        }

        let mut lower = 0.0_f64;
        let mut tiers = Vec::with_capacity(self.bands.len());
        for band in &self.bands {
            let upper = band.up_to_kwh.unwrap_or(f64::INFINITY);
            let quantity_kwh = (net_kwh - lower).clamp(0.0, (upper - lower).max(0.0));
            tiers.push(TierCharge {
                from_kwh: lower,
                up_to_kwh: band.up_to_kwh,
                quantity_kwh,
                rate: band.rate,
                cost: quantity_kwh * band.rate,
            });
            lower = upper;
        }

        let subtotal: f64 = tiers.iter().map(|t| t.cost).sum();
        self.finish(net_kwh, tiers, subtotal, None)
    }

    /// Bills only the fixed charge for `net_kwh`.
    pub fn fixed(&self, net_kwh: f64, reason: FixedReason) -> TariffBreakdown {
        self.finish(net_kwh, Vec::new(), self.fixed_charge, Some(reason))
    }

    /// Fixed charge including tax.
    pub fn fixed_total(&self) -> f64 {
        self.fixed_charge + self.fixed_charge * self.tax_rate
    }

    fn finish(
        &self,
        net_kwh: f64,
        tiers: Vec<TierCharge>,
        subtotal: f64,
        fixed_reason: Option<FixedReason>,
    ) -> TariffBreakdown {
        let tax = subtotal * self.tax_rate;
        TariffBreakdown {
            net_kwh,
            tiers,
            subtotal,
            tax,
            total: subtotal + tax,
            fixed_reason,
        }
    }
}
