//! Casino games: roulette and blackjack.
//!
//! Both games debit and credit company cash deterministically against a
//! documented payout table; all chance flows through the injectable
//! [`GameRng`].
//!
//! # Payouts
//!
//! | Game | Bet | Pays |
//! |------|-----|------|
//! | Roulette | straight number | 35:1 |
//! | Roulette | color / parity | 1:1 |
//! | Blackjack | natural blackjack | 3:2 |
//! | Blackjack | win | 1:1 |
//! | Blackjack | push | stake back |
//!
//! Roulette uses a single-zero wheel (0..=36). Blackjack is a per-hand
//! state machine keyed on a game id: `dealt -> hit* -> stand | double |
//! bust`; the dealer stands on 17.

use serde::{Deserialize, Serialize};

use boomtown_types::{CasinoGameId, GameCompanyId, GameError, Money};

use crate::rng::GameRng;

// ---------------------------------------------------------------------------
// Roulette
// ---------------------------------------------------------------------------

/// The red numbers of a single-zero wheel.
const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// A roulette bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RouletteBet {
    /// A single number, `0..=36`; pays 35:1.
    Straight(u8),
    /// Red; pays 1:1 (zero loses).
    Red,
    /// Black; pays 1:1 (zero loses).
    Black,
    /// Even numbers; pays 1:1 (zero loses).
    Even,
    /// Odd numbers; pays 1:1.
    Odd,
}

/// One settled roulette spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouletteResult {
    /// Where the ball landed, `0..=36`.
    pub landed: u8,
    /// The stake returned plus winnings; zero on a loss.
    pub payout: Money,
}

/// Spin the wheel for one bet.
///
/// The caller debits the wager beforehand and credits `payout` after; a
/// losing spin pays zero.
pub fn spin_roulette(
    bet: RouletteBet,
    wager: Money,
    rng: &mut GameRng,
) -> Result<RouletteResult, GameError> {
    if wager.minor() <= 0 {
        return Err(GameError::invalid("wager must be positive"));
    }
    if let RouletteBet::Straight(n) = bet {
        if n > 36 {
            return Err(GameError::invalid("straight bets cover 0..=36"));
        }
    }

    let landed = u8::try_from(rng.below(37)).unwrap_or(0);
    let won = match bet {
        RouletteBet::Straight(n) => landed == n,
        RouletteBet::Red => RED_NUMBERS.contains(&landed),
        RouletteBet::Black => landed != 0 && !RED_NUMBERS.contains(&landed),
        RouletteBet::Even => landed != 0 && landed % 2 == 0,
        RouletteBet::Odd => landed % 2 == 1,
    };

    let payout = if won {
        let multiple: i64 = match bet {
            RouletteBet::Straight(_) => 36, // stake + 35:1
            _ => 2,                         // stake + 1:1
        };
        wager
            .minor()
            .checked_mul(multiple)
            .map(Money::from_minor)
            .ok_or_else(|| GameError::internal("payout overflow"))?
    } else {
        Money::ZERO
    };

    Ok(RouletteResult { landed, payout })
}

// ---------------------------------------------------------------------------
// Blackjack
// ---------------------------------------------------------------------------

/// The phase of a blackjack hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackPhase {
    /// Cards dealt; the player may hit, stand, or double.
    Dealt,
    /// The player went over 21; the stake is lost.
    Bust,
    /// The player stood; the dealer has played and the hand is settled.
    Settled,
}

/// One blackjack hand in progress, keyed on its game id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackjackGame {
    /// The hand's identifier.
    pub id: CasinoGameId,
    /// The playing company.
    pub company: GameCompanyId,
    /// The stake (doubled in place by a double-down).
    pub wager: Money,
    /// The player's cards as ranks (1 = ace .. 13 = king).
    pub player: Vec<u8>,
    /// The dealer's cards; one card is dealt face-up at the start, the
    /// rest arrive when the player stands.
    pub dealer: Vec<u8>,
    /// Whether the player doubled down.
    pub doubled: bool,
    /// The hand's phase.
    pub phase: BlackjackPhase,
}

/// The best total of a hand, counting one ace as 11 when that does not
/// bust.
pub fn hand_value(cards: &[u8]) -> u8 {
    let mut total: u8 = 0;
    let mut aces = 0u8;
    for &rank in cards {
        let pips = match rank {
            1 => {
                aces = aces.saturating_add(1);
                1
            }
            11..=13 => 10,
            r => r,
        };
        total = total.saturating_add(pips);
    }
    if aces > 0 && total.saturating_add(10) <= 21 {
        total.saturating_add(10)
    } else {
        total
    }
}

/// Whether a two-card hand is a natural blackjack.
fn is_natural(cards: &[u8]) -> bool {
    cards.len() == 2 && hand_value(cards) == 21
}

/// Draw one card rank from an effectively infinite shoe.
fn draw(rng: &mut GameRng) -> u8 {
    u8::try_from(rng.below(13)).unwrap_or(0).saturating_add(1)
}

impl BlackjackGame {
    /// Deal a new hand. The caller debits the wager first.
    pub fn deal(company: GameCompanyId, wager: Money, rng: &mut GameRng) -> Result<Self, GameError> {
        if wager.minor() <= 0 {
            return Err(GameError::invalid("wager must be positive"));
        }
        Ok(Self {
            id: CasinoGameId::new(),
            company,
            wager,
            player: vec![draw(rng), draw(rng)],
            dealer: vec![draw(rng)],
            doubled: false,
            phase: BlackjackPhase::Dealt,
        })
    }

    /// Take another card. Going over 21 busts the hand immediately.
    pub fn hit(&mut self, rng: &mut GameRng) -> Result<(), GameError> {
        self.ensure_open()?;
        self.player.push(draw(rng));
        if hand_value(&self.player) > 21 {
            self.phase = BlackjackPhase::Bust;
        }
        Ok(())
    }

    /// Double the stake, take exactly one card, and stand.
    ///
    /// Only allowed on the first decision (two cards). The caller debits
    /// the extra wager before calling.
    pub fn double(&mut self, rng: &mut GameRng) -> Result<(), GameError> {
        self.ensure_open()?;
        if self.player.len() != 2 {
            return Err(GameError::precondition("double is only allowed on two cards"));
        }
        self.wager = self
            .wager
            .checked_add(self.wager)
            .ok_or_else(|| GameError::internal("wager overflow"))?;
        self.doubled = true;
        self.player.push(draw(rng));
        if hand_value(&self.player) > 21 {
            self.phase = BlackjackPhase::Bust;
        } else {
            self.stand(rng)?;
        }
        Ok(())
    }

    /// Stand: the dealer draws to 17 and the hand settles.
    pub fn stand(&mut self, rng: &mut GameRng) -> Result<(), GameError> {
        self.ensure_open()?;
        while hand_value(&self.dealer) < 17 {
            self.dealer.push(draw(rng));
        }
        self.phase = BlackjackPhase::Settled;
        Ok(())
    }

    /// The payout owed for a finished hand (zero for a loss, the stake
    /// for a push, 3:2 on a natural).
    pub fn payout(&self) -> Result<Money, GameError> {
        match self.phase {
            BlackjackPhase::Dealt => Err(GameError::precondition("hand is still open")),
            BlackjackPhase::Bust => Ok(Money::ZERO),
            BlackjackPhase::Settled => {
                let player = hand_value(&self.player);
                let dealer = hand_value(&self.dealer);
                let stake = self.wager.minor();
                let owed = if is_natural(&self.player) && !is_natural(&self.dealer) {
                    // Stake back plus 3:2.
                    stake
                        .checked_mul(5)
                        .and_then(|s| s.checked_div(2))
                        .ok_or_else(|| GameError::internal("payout overflow"))?
                } else if dealer > 21 || player > dealer {
                    stake
                        .checked_mul(2)
                        .ok_or_else(|| GameError::internal("payout overflow"))?
                } else if player == dealer {
                    stake
                } else {
                    0
                };
                Ok(Money::from_minor(owed))
            }
        }
    }

    /// The hand must still accept player decisions.
    fn ensure_open(&self) -> Result<(), GameError> {
        if self.phase != BlackjackPhase::Dealt {
            return Err(GameError::precondition("hand is already finished"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn straight_pays_thirty_five_to_one() {
        // Find a seed that lands on 17, then bet 17 straight.
        for seed in 0..512 {
            let mut probe = GameRng::from_seed(seed);
            if probe.below(37) == 17 {
                let mut rng = GameRng::from_seed(seed);
                let result = spin_roulette(
                    RouletteBet::Straight(17),
                    Money::from_minor(100),
                    &mut rng,
                )
                .unwrap();
                assert_eq!(result.landed, 17);
                assert_eq!(result.payout, Money::from_minor(3_600));
                return;
            }
        }
        // 512 seeds without a 17 would itself indicate a broken wheel.
        assert!(false, "no seed landed on 17");
    }

    #[test]
    fn color_bets_pay_even_money() {
        let mut rng = GameRng::from_seed(5);
        let result = spin_roulette(RouletteBet::Red, Money::from_minor(100), &mut rng).unwrap();
        let expected = if RED_NUMBERS.contains(&result.landed) {
            Money::from_minor(200)
        } else {
            Money::ZERO
        };
        assert_eq!(result.payout, expected);
    }

    #[test]
    fn zero_loses_even_money_bets() {
        for seed in 0..512 {
            let mut probe = GameRng::from_seed(seed);
            if probe.below(37) == 0 {
                for bet in [RouletteBet::Red, RouletteBet::Black, RouletteBet::Even] {
                    let mut rng = GameRng::from_seed(seed);
                    let result = spin_roulette(bet, Money::from_minor(100), &mut rng).unwrap();
                    assert_eq!(result.payout, Money::ZERO);
                }
                return;
            }
        }
        assert!(false, "no seed landed on zero");
    }

    #[test]
    fn invalid_bets_rejected() {
        let mut rng = GameRng::from_seed(1);
        assert!(spin_roulette(RouletteBet::Straight(37), Money::from_minor(100), &mut rng).is_err());
        assert!(spin_roulette(RouletteBet::Red, Money::ZERO, &mut rng).is_err());
    }

    #[test]
    fn hand_values_respect_aces() {
        assert_eq!(hand_value(&[1, 10]), 21);
        assert_eq!(hand_value(&[1, 1, 9]), 21);
        assert_eq!(hand_value(&[1, 5]), 16);
        assert_eq!(hand_value(&[10, 12]), 20); // face cards are ten
        assert_eq!(hand_value(&[1, 10, 10]), 21);
        assert_eq!(hand_value(&[10, 9, 5]), 24);
    }

    #[test]
    fn blackjack_state_machine_walks_dealt_to_settled() {
        let mut rng = GameRng::from_seed(11);
        let mut game =
            BlackjackGame::deal(GameCompanyId::new(), Money::from_minor(500), &mut rng).unwrap();
        assert_eq!(game.phase, BlackjackPhase::Dealt);
        assert_eq!(game.player.len(), 2);
        assert_eq!(game.dealer.len(), 1);

        game.stand(&mut rng).unwrap();
        assert_eq!(game.phase, BlackjackPhase::Settled);
        assert!(hand_value(&game.dealer) >= 17);
        // Settlement is now queryable and further decisions rejected.
        assert!(game.payout().is_ok());
        assert!(game.hit(&mut rng).is_err());
    }

    #[test]
    fn busting_loses_the_stake() {
        // Drive a hand until it busts (infinite shoe guarantees it).
        let mut rng = GameRng::from_seed(13);
        let mut game =
            BlackjackGame::deal(GameCompanyId::new(), Money::from_minor(500), &mut rng).unwrap();
        for _ in 0..32 {
            if game.phase != BlackjackPhase::Dealt {
                break;
            }
            game.hit(&mut rng).unwrap();
        }
        assert_eq!(game.phase, BlackjackPhase::Bust);
        assert_eq!(game.payout().unwrap(), Money::ZERO);
    }

    #[test]
    fn double_doubles_the_stake_and_ends_the_hand() {
        let mut rng = GameRng::from_seed(17);
        let mut game =
            BlackjackGame::deal(GameCompanyId::new(), Money::from_minor(500), &mut rng).unwrap();
        game.double(&mut rng).unwrap();
        assert!(game.doubled);
        assert_eq!(game.wager, Money::from_minor(1_000));
        assert_ne!(game.phase, BlackjackPhase::Dealt);
    }

    #[test]
    fn open_hand_has_no_payout_yet() {
        let mut rng = GameRng::from_seed(19);
        let game =
            BlackjackGame::deal(GameCompanyId::new(), Money::from_minor(500), &mut rng).unwrap();
        assert!(game.payout().is_err());
    }

    #[test]
    fn settled_payout_matches_totals() {
        let game = BlackjackGame {
            id: CasinoGameId::new(),
            company: GameCompanyId::new(),
            wager: Money::from_minor(1_000),
            player: vec![10, 9],   // 19
            dealer: vec![10, 8],   // 18
            doubled: false,
            phase: BlackjackPhase::Settled,
        };
        assert_eq!(game.payout().unwrap(), Money::from_minor(2_000));

        let push = BlackjackGame {
            player: vec![10, 8],
            ..game.clone()
        };
        assert_eq!(push.payout().unwrap(), Money::from_minor(1_000));

        let natural = BlackjackGame {
            player: vec![1, 13],
            ..game.clone()
        };
        assert_eq!(natural.payout().unwrap(), Money::from_minor(2_500));

        let loss = BlackjackGame {
            player: vec![10, 7],
            ..game
        };
        assert_eq!(loss.payout().unwrap(), Money::ZERO);
    }
}
