//! Vault ledger math
//!
//! Pure functions over [`VaultTotals`] and [`Position`]. Each operation
//! validates and computes the full outcome first and writes to the ledger
//! only once nothing can fail, so an error never leaves a partial update.

use crate::{
    error::VaultError,
    math::{
        bps_of, from_wad, from_wad_ceil, mul_div, mul_div_ceil, percent_to_wad, to_wad, wad_div,
        PERCENT, WAD,
    },
    state::{Position, PositionStatus, VaultParams, VaultTotals},
};

/// Sentinel ratio for positions without debt
pub const NO_DEBT_RATIO: u128 = u128::MAX;

/// Oracle price and token scales in effect for one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    /// Collateral-asset value of one synthetic unit, WAD
    pub price_wad: u128,
    pub collateral_decimals: u8,
    pub synthetic_decimals: u8,
}

impl Valuation {
    pub fn new(
        price: u64,
        price_decimals: u8,
        collateral_decimals: u8,
        synthetic_decimals: u8,
    ) -> Result<Self, VaultError> {
        if price == 0 {
            return Err(VaultError::InvalidOracleAccount);
        }
        // Reject unsupported scales up front
        to_wad(0, collateral_decimals)?;
        to_wad(0, synthetic_decimals)?;

        Ok(Self {
            price_wad: to_wad(price, price_decimals)?,
            collateral_decimals,
            synthetic_decimals,
        })
    }

    pub fn collateral_wad(&self, amount: u64) -> Result<u128, VaultError> {
        to_wad(amount, self.collateral_decimals)
    }

    /// Value of `debt` synthetic units in collateral terms, WAD, rounded down
    pub fn debt_value(&self, debt: u64) -> Result<u128, VaultError> {
        mul_div(to_wad(debt, self.synthetic_decimals)?, self.price_wad, WAD)
    }

    /// Same as [`Self::debt_value`], rounded up
    pub fn debt_value_ceil(&self, debt: u64) -> Result<u128, VaultError> {
        mul_div_ceil(to_wad(debt, self.synthetic_decimals)?, self.price_wad, WAD)
    }

    /// Collateral ratio in WAD-scaled percent (150% -> 150e18).
    /// [`NO_DEBT_RATIO`] when there is no debt to back.
    pub fn collateral_ratio(&self, collateral: u64, debt: u64) -> Result<u128, VaultError> {
        if debt == 0 {
            return Ok(NO_DEBT_RATIO);
        }

        let debt_value = self.debt_value(debt)?;
        if debt_value == 0 {
            return Ok(NO_DEBT_RATIO);
        }

        match mul_div(self.collateral_wad(collateral)?, PERCENT * WAD, debt_value) {
            Err(VaultError::ArithmeticOverflow) => Ok(NO_DEBT_RATIO),
            result => result,
        }
    }

    /// Collateral needed to hold `ratio_percent` against `debt`, rounded up
    pub fn required_collateral(&self, debt: u64, ratio_percent: u64) -> Result<u64, VaultError> {
        let required_wad = mul_div_ceil(
            self.debt_value_ceil(debt)?,
            ratio_percent as u128,
            PERCENT,
        )?;
        from_wad_ceil(required_wad, self.collateral_decimals)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintOutcome {
    pub fee: u64,
    pub net_collateral: u64,
    /// Collateral-terms value backed by the new debt, WAD
    pub debt_value_wad: u128,
    pub tokens_minted: u64,
    /// Global ratio after the mint, WAD-scaled percent
    pub global_collateral_ratio: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemOutcome {
    /// Proportional share of the position's collateral
    pub collateral_out: u64,
    pub fee: u64,
    /// Excess above the minimum ratio released on top of `collateral_out`
    pub surplus: u64,
    /// Amount transferred to the owner
    pub collateral_to_owner: u64,
    pub position_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationOutcome {
    /// Collateral transferred to the liquidator
    pub collateral_seized: u64,
    /// Bonus-inclusive value the position could not cover
    pub shortfall: u64,
    /// Collateral returned to the owner once the debt is cleared
    pub dust_refund: u64,
    pub position_closed: bool,
}

fn add(a: u64, b: u64) -> Result<u64, VaultError> {
    a.checked_add(b).ok_or(VaultError::ArithmeticOverflow)
}

fn sub(a: u64, b: u64) -> Result<u64, VaultError> {
    a.checked_sub(b).ok_or(VaultError::ArithmeticOverflow)
}

pub struct VaultEngine;

impl VaultEngine {
    /// Ratio of backing collateral to outstanding debt at the current price
    pub fn global_collateral_ratio(
        totals: &VaultTotals,
        valuation: &Valuation,
    ) -> Result<u128, VaultError> {
        valuation.collateral_ratio(totals.backing_collateral()?, totals.total_debt)
    }

    pub fn user_collateral_ratio(
        position: &Position,
        valuation: &Valuation,
    ) -> Result<u128, VaultError> {
        valuation.collateral_ratio(position.collateral, position.debt)
    }

    pub fn position_status(
        params: &VaultParams,
        position: &Position,
        valuation: &Valuation,
    ) -> Result<PositionStatus, VaultError> {
        let ratio = Self::user_collateral_ratio(position, valuation)?;
        Ok(position.status(ratio, percent_to_wad(params.liquidation_threshold)))
    }

    /// Price (WAD) at which the position reaches the liquidation threshold.
    /// Zero for a position without debt.
    pub fn liquidation_price(
        params: &VaultParams,
        position: &Position,
        collateral_decimals: u8,
        synthetic_decimals: u8,
    ) -> Result<u128, VaultError> {
        if position.debt == 0 {
            return Ok(0);
        }

        let collateral_wad = to_wad(position.collateral, collateral_decimals)?;
        let debt_wad = to_wad(position.debt, synthetic_decimals)?;

        // collateral * 100 / (debt * threshold)
        let per_unit_percent = mul_div(collateral_wad, PERCENT * WAD, debt_wad)?;
        mul_div(per_unit_percent, 1, params.liquidation_threshold as u128)
    }

    pub fn mint(
        params: &VaultParams,
        totals: &mut VaultTotals,
        position: &mut Position,
        valuation: &Valuation,
        collateral_in: u64,
        target_collateral_ratio: u64,
    ) -> Result<MintOutcome, VaultError> {
        if collateral_in == 0 {
            return Err(VaultError::AmountZero);
        }

        if target_collateral_ratio < params.min_collateral_ratio {
            return Err(VaultError::CollateralRatioTooLow);
        }

        let fee = bps_of(collateral_in, params.mint_fee_bps)?;
        let net_collateral = sub(collateral_in, fee)?;

        let debt_value_wad = mul_div(
            valuation.collateral_wad(net_collateral)?,
            PERCENT,
            target_collateral_ratio as u128,
        )?;
        let tokens_wad = wad_div(debt_value_wad, valuation.price_wad)?;
        let tokens_minted = from_wad(tokens_wad, valuation.synthetic_decimals)?;

        if tokens_minted == 0 {
            return Err(VaultError::MintAmountTooSmall);
        }

        let mut next_totals = *totals;
        next_totals.total_collateral = add(totals.total_collateral, net_collateral)?;
        next_totals.total_debt = add(totals.total_debt, tokens_minted)?;
        next_totals.accrued_fees = add(totals.accrued_fees, fee)?;

        let global_collateral_ratio = Self::global_collateral_ratio(&next_totals, valuation)?;
        if global_collateral_ratio < percent_to_wad(params.min_collateral_ratio) {
            return Err(VaultError::CollateralRatioViolation);
        }

        let collateral = add(position.collateral, net_collateral)?;
        let debt = add(position.debt, tokens_minted)?;

        *totals = next_totals;
        position.collateral = collateral;
        position.debt = debt;

        Ok(MintOutcome {
            fee,
            net_collateral,
            debt_value_wad,
            tokens_minted,
            global_collateral_ratio,
        })
    }

    /// Burns `token_amount` of the position's debt. Without a fresh
    /// valuation only the proportional share is released.
    pub fn redeem(
        params: &VaultParams,
        totals: &mut VaultTotals,
        position: &mut Position,
        valuation: Option<&Valuation>,
        token_amount: u64,
    ) -> Result<RedeemOutcome, VaultError> {
        if token_amount == 0 {
            return Err(VaultError::AmountZero);
        }

        if token_amount > position.debt {
            return Err(VaultError::InsufficientDebt);
        }

        let position_closed = token_amount == position.debt;
        let (collateral_out, surplus) = if position_closed {
            (position.collateral, 0)
        } else {
            let share = mul_div(
                position.collateral as u128,
                token_amount as u128,
                position.debt as u128,
            )?;
            let collateral_out = u64::try_from(share).map_err(|_| VaultError::ArithmeticOverflow)?;

            let remaining_collateral = sub(position.collateral, collateral_out)?;
            let remaining_debt = sub(position.debt, token_amount)?;
            let surplus = match valuation {
                Some(valuation) => {
                    let required = valuation
                        .required_collateral(remaining_debt, params.min_collateral_ratio)?;
                    remaining_collateral.saturating_sub(required)
                }
                None => 0,
            };
            (collateral_out, surplus)
        };

        let fee = bps_of(collateral_out, params.redeem_fee_bps)?;
        let released = add(collateral_out, surplus)?;
        let collateral_to_owner = sub(released, fee)?;

        let mut next_totals = *totals;
        next_totals.total_collateral = sub(totals.total_collateral, released)?;
        next_totals.total_debt = sub(totals.total_debt, token_amount)?;
        next_totals.accrued_fees = add(totals.accrued_fees, fee)?;

        let collateral = sub(position.collateral, released)?;
        let debt = sub(position.debt, token_amount)?;

        *totals = next_totals;
        position.collateral = collateral;
        position.debt = debt;

        Ok(RedeemOutcome {
            collateral_out,
            fee,
            surplus,
            collateral_to_owner,
            position_closed,
        })
    }

    pub fn liquidate(
        params: &VaultParams,
        totals: &mut VaultTotals,
        position: &mut Position,
        valuation: &Valuation,
        repay_amount: u64,
    ) -> Result<LiquidationOutcome, VaultError> {
        if repay_amount == 0 {
            return Err(VaultError::AmountZero);
        }

        if Self::position_status(params, position, valuation)? != PositionStatus::Liquidatable {
            return Err(VaultError::NotLiquidatable);
        }

        if repay_amount > position.debt {
            return Err(VaultError::RepayExceedsDebt);
        }

        let seize_wad = mul_div(
            valuation.debt_value(repay_amount)?,
            PERCENT + params.liquidation_bonus as u128,
            PERCENT,
        )?;
        let uncapped = from_wad(seize_wad, valuation.collateral_decimals)?;
        let remaining_debt = sub(position.debt, repay_amount)?;

        let (collateral_seized, shortfall) = if uncapped >= position.collateral {
            // Seizing everything while debt remains would strand that debt
            if remaining_debt > 0 {
                return Err(VaultError::InsufficientCollateralForLiquidation);
            }
            (position.collateral, uncapped - position.collateral)
        } else {
            (uncapped, 0)
        };

        let leftover = sub(position.collateral, collateral_seized)?;
        let dust_refund = if remaining_debt == 0 { leftover } else { 0 };
        let released = add(collateral_seized, dust_refund)?;

        let mut next_totals = *totals;
        next_totals.total_collateral = sub(totals.total_collateral, released)?;
        next_totals.total_debt = sub(totals.total_debt, repay_amount)?;
        next_totals.liquidation_shortfall = add(totals.liquidation_shortfall, shortfall)?;

        let collateral = sub(position.collateral, released)?;

        *totals = next_totals;
        position.collateral = collateral;
        position.debt = remaining_debt;

        Ok(LiquidationOutcome {
            collateral_seized,
            shortfall,
            dust_refund,
            position_closed: remaining_debt == 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::pubkey::Pubkey;

    const COLLATERAL_DECIMALS: u8 = 6;
    const SYNTHETIC_DECIMALS: u8 = 8;
    const PRICE_DECIMALS: u8 = 8;

    fn valuation(price: u64) -> Valuation {
        Valuation::new(price, PRICE_DECIMALS, COLLATERAL_DECIMALS, SYNTHETIC_DECIMALS).unwrap()
    }

    fn params() -> VaultParams {
        VaultParams {
            mint_fee_bps: 30,
            redeem_fee_bps: 50,
            min_collateral_ratio: 150,
            liquidation_threshold: 120,
            liquidation_bonus: 10,
            permissionless_liquidation: true,
        }
    }

    fn position() -> Position {
        Position::new(Pubkey::new_unique(), Pubkey::new_unique(), 255)
    }

    fn seeded(collateral: u64, debt: u64) -> (VaultTotals, Position) {
        let mut position = position();
        position.collateral = collateral;
        position.debt = debt;
        let totals = VaultTotals {
            total_collateral: collateral,
            total_debt: debt,
            ..VaultTotals::default()
        };
        (totals, position)
    }

    #[test]
    fn test_mint_reference_scenario() {
        let params = params();
        let mut totals = VaultTotals::default();
        let mut position = position();
        let valuation = valuation(4_215_000_000); // 42.15

        let outcome = VaultEngine::mint(
            &params, &mut totals, &mut position, &valuation, 100_000_000, 150,
        ).unwrap();

        assert_eq!(outcome.fee, 300_000); // 0.30
        assert_eq!(outcome.net_collateral, 99_700_000); // 99.70
        assert_eq!(outcome.debt_value_wad, 66_466_666_666_666_666_666); // 66.4667
        assert_eq!(outcome.tokens_minted, 157_690_786); // 66.4667 / 42.15

        // Only position in the vault: global ratio lands on the target,
        // rounding in the vault's favour
        let target = percent_to_wad(150);
        assert!(outcome.global_collateral_ratio >= target);
        assert!(outcome.global_collateral_ratio - target < WAD / 1_000_000);

        assert_eq!(position.collateral, 99_700_000);
        assert_eq!(position.debt, 157_690_786);
        assert_eq!(totals.total_collateral, position.collateral);
        assert_eq!(totals.total_debt, position.debt);
        assert_eq!(totals.accrued_fees, 300_000);
    }

    #[test]
    fn test_full_redeem_returns_collateral_less_fee() {
        let params = params();
        let mut totals = VaultTotals::default();
        let mut position = position();
        let valuation = valuation(4_215_000_000);

        let minted = VaultEngine::mint(
            &params, &mut totals, &mut position, &valuation, 100_000_000, 150,
        ).unwrap();
        let outcome = VaultEngine::redeem(
            &params, &mut totals, &mut position, Some(&valuation), minted.tokens_minted,
        ).unwrap();

        assert!(outcome.position_closed);
        assert_eq!(outcome.collateral_out, 99_700_000);
        assert_eq!(outcome.fee, 498_500);
        assert_eq!(outcome.surplus, 0);
        assert_eq!(outcome.collateral_to_owner, 99_201_500);

        assert_eq!(position.debt, 0);
        assert_eq!(position.collateral, 0);
        assert_eq!(totals.total_collateral, 0);
        assert_eq!(totals.total_debt, 0);
        assert_eq!(totals.accrued_fees, 300_000 + 498_500);
    }

    #[test]
    fn test_liquidation_after_price_move() {
        let params = params();
        let mut totals = VaultTotals::default();
        let mut position = position();
        let before = valuation(4_215_000_000);

        let minted = VaultEngine::mint(
            &params, &mut totals, &mut position, &before, 100_000_000, 150,
        ).unwrap();
        let repay = minted.tokens_minted / 2;

        // Healthy at 150%
        let mut untouched_totals = totals;
        let mut untouched_position = position.clone();
        assert_eq!(
            VaultEngine::liquidate(&params, &mut untouched_totals, &mut untouched_position, &before, repay),
            Err(VaultError::NotLiquidatable)
        );
        assert_eq!(untouched_position, position);
        assert_eq!(untouched_totals, totals);

        // 42.15 * 150 / 110: ratio falls to ~110%
        let after = valuation(5_747_727_273);
        let ratio = VaultEngine::user_collateral_ratio(&position, &after).unwrap();
        assert!(ratio > percent_to_wad(109));
        assert!(ratio < percent_to_wad(111));
        assert_eq!(
            VaultEngine::position_status(&params, &position, &after).unwrap(),
            PositionStatus::Liquidatable
        );

        let outcome = VaultEngine::liquidate(&params, &mut totals, &mut position, &after, repay).unwrap();
        let expected_seized = from_wad(
            after.debt_value(repay).unwrap() * 110 / 100,
            COLLATERAL_DECIMALS,
        ).unwrap();
        assert_eq!(outcome.collateral_seized, expected_seized);
        assert_eq!(outcome.shortfall, 0);
        assert_eq!(outcome.dust_refund, 0);
        assert!(!outcome.position_closed);

        assert_eq!(position.debt, minted.tokens_minted - repay);
        assert_eq!(position.collateral, 99_700_000 - expected_seized);
        assert_eq!(totals.total_collateral, position.collateral);
        assert_eq!(totals.total_debt, position.debt);
    }

    #[test]
    fn test_liquidation_clearing_debt_refunds_dust_to_owner() {
        let params = params();
        // 115 collateral against 1.0 synthetic at price 100: 115%
        let (mut totals, mut position) = seeded(115_000_000, 100_000_000);
        let valuation = valuation(10_000_000_000);

        let outcome = VaultEngine::liquidate(
            &params, &mut totals, &mut position, &valuation, 100_000_000,
        ).unwrap();

        assert_eq!(outcome.collateral_seized, 110_000_000);
        assert_eq!(outcome.dust_refund, 5_000_000);
        assert_eq!(outcome.shortfall, 0);
        assert!(outcome.position_closed);
        assert!(position.is_empty());
        assert_eq!(totals.total_collateral, 0);
        assert_eq!(totals.total_debt, 0);
    }

    #[test]
    fn test_insolvent_partial_liquidation_is_reported() {
        let params = params();
        // 100% ratio: bonus-inclusive seizure exceeds what the position holds
        let (mut totals, mut position) = seeded(100_000_000, 100_000_000);
        let valuation = valuation(10_000_000_000);
        let snapshot = (totals, position.clone());

        assert_eq!(
            VaultEngine::liquidate(&params, &mut totals, &mut position, &valuation, 95_000_000),
            Err(VaultError::InsufficientCollateralForLiquidation)
        );
        assert_eq!((totals, position.clone()), snapshot);

        // Clearing the whole debt takes everything and records the gap
        let outcome = VaultEngine::liquidate(
            &params, &mut totals, &mut position, &valuation, 100_000_000,
        ).unwrap();
        assert_eq!(outcome.collateral_seized, 100_000_000);
        assert_eq!(outcome.shortfall, 10_000_000);
        assert_eq!(outcome.dust_refund, 0);
        assert!(position.is_empty());
        assert_eq!(totals.liquidation_shortfall, 10_000_000);
        assert_eq!(totals.total_collateral, 0);
    }

    #[test]
    fn test_liquidation_input_errors() {
        let params = params();
        let (mut totals, mut position) = seeded(100_000_000, 100_000_000);
        let valuation = valuation(10_000_000_000);

        assert_eq!(
            VaultEngine::liquidate(&params, &mut totals, &mut position, &valuation, 0),
            Err(VaultError::AmountZero)
        );
        assert_eq!(
            VaultEngine::liquidate(&params, &mut totals, &mut position, &valuation, 100_000_001),
            Err(VaultError::RepayExceedsDebt)
        );

        let mut empty = self::position();
        assert_eq!(
            VaultEngine::liquidate(&params, &mut totals, &mut empty, &valuation, 1),
            Err(VaultError::NotLiquidatable)
        );
    }

    #[test]
    fn test_partial_redeem_refunds_surplus() {
        let params = params();
        // 300 collateral against 1.0 synthetic at price 100: 300%
        let (mut totals, mut position) = seeded(300_000_000, 100_000_000);
        let valuation = valuation(10_000_000_000);

        let outcome = VaultEngine::redeem(
            &params, &mut totals, &mut position, Some(&valuation), 50_000_000,
        ).unwrap();

        assert_eq!(outcome.collateral_out, 150_000_000);
        assert_eq!(outcome.surplus, 75_000_000);
        assert_eq!(outcome.fee, 750_000);
        assert_eq!(outcome.collateral_to_owner, 150_000_000 - 750_000 + 75_000_000);
        assert!(!outcome.position_closed);

        assert_eq!(position.collateral, 75_000_000);
        assert_eq!(position.debt, 50_000_000);
        assert_eq!(
            VaultEngine::user_collateral_ratio(&position, &valuation).unwrap(),
            percent_to_wad(150)
        );
        assert_eq!(totals.total_collateral, 75_000_000);
        assert_eq!(totals.total_debt, 50_000_000);
    }

    #[test]
    fn test_redeem_without_fresh_price_skips_surplus() {
        let params = params();
        let (mut totals, mut position) = seeded(300_000_000, 100_000_000);

        let outcome = VaultEngine::redeem(&params, &mut totals, &mut position, None, 50_000_000).unwrap();
        assert_eq!(outcome.collateral_out, 150_000_000);
        assert_eq!(outcome.surplus, 0);
        assert_eq!(position.collateral, 150_000_000);
    }

    #[test]
    fn test_redeem_below_minimum_has_no_surplus() {
        let params = params();
        // 130%: above the liquidation threshold, below the minimum
        let (mut totals, mut position) = seeded(130_000_000, 100_000_000);
        let valuation = valuation(10_000_000_000);

        let outcome = VaultEngine::redeem(
            &params, &mut totals, &mut position, Some(&valuation), 10_000_000,
        ).unwrap();
        assert_eq!(outcome.collateral_out, 13_000_000);
        assert_eq!(outcome.surplus, 0);
        assert_eq!(position.collateral, 117_000_000);
    }

    #[test]
    fn test_redeem_input_errors() {
        let params = params();
        let (mut totals, mut position) = seeded(150_000_000, 100_000_000);

        assert_eq!(
            VaultEngine::redeem(&params, &mut totals, &mut position, None, 0),
            Err(VaultError::AmountZero)
        );
        assert_eq!(
            VaultEngine::redeem(&params, &mut totals, &mut position, None, 100_000_001),
            Err(VaultError::InsufficientDebt)
        );
    }

    #[test]
    fn test_mint_input_errors() {
        let params = params();
        let mut totals = VaultTotals::default();
        let mut position = position();
        let valuation = valuation(4_215_000_000);

        assert_eq!(
            VaultEngine::mint(&params, &mut totals, &mut position, &valuation, 0, 150),
            Err(VaultError::AmountZero)
        );
        assert_eq!(
            VaultEngine::mint(&params, &mut totals, &mut position, &valuation, 100_000_000, 149),
            Err(VaultError::CollateralRatioTooLow)
        );
        // 1 base unit of collateral cannot buy a whole synthetic base unit
        assert_eq!(
            VaultEngine::mint(&params, &mut totals, &mut position, &valuation, 1, 150),
            Err(VaultError::MintAmountTooSmall)
        );
        assert!(position.is_empty());
        assert_eq!(totals, VaultTotals::default());
    }

    #[test]
    fn test_small_amounts_still_pay_fees() {
        let params = params();
        let mut totals = VaultTotals::default();
        let mut position = position();
        // Whole-unit tokens, price 1.0
        let valuation = Valuation::new(100_000_000, 8, 0, 0).unwrap();

        let minted = VaultEngine::mint(&params, &mut totals, &mut position, &valuation, 10, 150).unwrap();
        assert_eq!(minted.fee, 1);
        assert_eq!(minted.net_collateral, 9);
        assert_eq!(minted.tokens_minted, 6);

        let redeemed = VaultEngine::redeem(
            &params, &mut totals, &mut position, Some(&valuation), 3,
        ).unwrap();
        assert_eq!(redeemed.collateral_out, 4);
        assert_eq!(redeemed.fee, 1);
        assert_eq!(redeemed.surplus, 0);
        assert_eq!(redeemed.collateral_to_owner, 3);
        assert_eq!(totals.accrued_fees, 2);
        assert_eq!(position.collateral, 5);
        assert_eq!(position.debt, 3);
    }

    #[test]
    fn test_mint_and_redeem_across_decimal_scales() {
        let params = params();
        let floor = percent_to_wad(params.min_collateral_ratio);

        // (collateral, synthetic, price) decimals
        let scales: [(u8, u8, u8); 7] = [
            (0, 18, 8),
            (9, 9, 0),
            (2, 12, 12),
            (18, 0, 6),
            (18, 18, 18),
            (0, 0, 0),
            (6, 8, 8),
        ];

        for (cd, sd, pd) in scales {
            let valuation = Valuation::new(3 * 10u64.pow(pd as u32), pd, cd, sd).unwrap(); // 3.0
            let collateral_in = 10 * 10u64.pow(cd as u32); // 10 whole units
            let mut totals = VaultTotals::default();
            let mut position = position();

            let minted = VaultEngine::mint(
                &params, &mut totals, &mut position, &valuation, collateral_in, 150,
            ).unwrap();
            assert!(minted.tokens_minted > 0, "scale {:?}", (cd, sd, pd));
            assert!(minted.global_collateral_ratio >= floor, "scale {:?}", (cd, sd, pd));

            // 10 * 0.997 / 1.5 / 3.0 = 2.2155... whole synthetic units
            let whole_tokens = minted.tokens_minted / 10u64.pow(sd as u32);
            assert_eq!(whole_tokens, 2, "scale {:?}", (cd, sd, pd));

            let redeemed = VaultEngine::redeem(
                &params, &mut totals, &mut position, Some(&valuation), minted.tokens_minted,
            ).unwrap();
            assert!(position.is_empty());
            assert!(redeemed.collateral_to_owner <= collateral_in);
            assert_eq!(totals.accrued_fees + redeemed.collateral_to_owner, collateral_in);
        }

        // One unit of 18-decimal collateral backs less than one whole-unit token
        let valuation = Valuation::new(3_000_000, 6, 18, 0).unwrap();
        let mut totals = VaultTotals::default();
        let mut position = position();
        assert_eq!(
            VaultEngine::mint(
                &params, &mut totals, &mut position, &valuation, 1_000_000_000_000_000_000, 150,
            ),
            Err(VaultError::MintAmountTooSmall)
        );
    }

    #[test]
    fn test_mint_rejected_when_global_ratio_under_water() {
        let params = params();
        // Existing position at 150% at price 100
        let (mut totals, _) = seeded(150_000_000, 100_000_000);
        // Price doubles: global ratio drops to 75%
        let valuation = valuation(20_000_000_000);
        let snapshot = totals;

        let mut second = position();
        assert_eq!(
            VaultEngine::mint(&params, &mut totals, &mut second, &valuation, 100_000_000, 200),
            Err(VaultError::CollateralRatioViolation)
        );
        assert_eq!(totals, snapshot);
        assert!(second.is_empty());

        // A governance top-up restores the global ratio
        totals.reserve_collateral = 300_000_000;
        VaultEngine::mint(&params, &mut totals, &mut second, &valuation, 100_000_000, 200).unwrap();
        assert!(
            VaultEngine::global_collateral_ratio(&totals, &valuation).unwrap() >= percent_to_wad(150)
        );
    }

    #[test]
    fn test_liquidation_price() {
        let params = params();
        let (_, position) = seeded(150_000_000, 100_000_000);

        // 150 collateral / (1.0 * 120%) = 125
        let price = VaultEngine::liquidation_price(
            &params, &position, COLLATERAL_DECIMALS, SYNTHETIC_DECIMALS,
        ).unwrap();
        assert_eq!(price, 125 * WAD);

        let at_threshold = valuation(12_500_000_000);
        assert_eq!(
            VaultEngine::user_collateral_ratio(&position, &at_threshold).unwrap(),
            percent_to_wad(120)
        );

        let empty = self::position();
        assert_eq!(
            VaultEngine::liquidation_price(&params, &empty, COLLATERAL_DECIMALS, SYNTHETIC_DECIMALS).unwrap(),
            0
        );
    }

    #[test]
    fn test_ratio_sentinel_without_debt() {
        let valuation = valuation(4_215_000_000);
        assert_eq!(valuation.collateral_ratio(0, 0).unwrap(), NO_DEBT_RATIO);
        assert_eq!(
            VaultEngine::global_collateral_ratio(&VaultTotals::default(), &valuation).unwrap(),
            NO_DEBT_RATIO
        );
    }

    #[test]
    fn test_valuation_rejects_bad_inputs() {
        assert_eq!(
            Valuation::new(0, 8, 6, 8),
            Err(VaultError::InvalidOracleAccount)
        );
        assert_eq!(
            Valuation::new(1, 8, 19, 8),
            Err(VaultError::InvalidDecimals)
        );
    }
}
