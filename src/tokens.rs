// Built-in token tables per chain

use crate::error::{AnalysisError, AnalysisResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Stable,
    BlueChip,
    Meme,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenClass::Stable => "stable",
            TokenClass::BlueChip => "blue_chip",
            TokenClass::Meme => "meme",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Ethereum,
    Arbitrum,
}

impl FromStr for Chain {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" | "eth" | "mainnet" => Ok(Chain::Ethereum),
            "arbitrum" | "arb" => Ok(Chain::Arbitrum),
            _ => Err(AnalysisError::UnknownChain(s.to_string())),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Ethereum => f.write_str("ethereum"),
            Chain::Arbitrum => f.write_str("arbitrum"),
        }
    }
}

type TokenRow = (&'static str, &'static str, TokenClass);

const ETHEREUM_TOKENS: &[TokenRow] = &[
    ("usdc", "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", TokenClass::Stable),
    ("usdt", "0xdac17f958d2ee523a2206206994597c13d831ec7", TokenClass::Stable),
    ("dai", "0x6b175474e89094c44da98b954eedeac495271d0f", TokenClass::Stable),
    ("wbtc", "0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", TokenClass::BlueChip),
    ("weth", "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", TokenClass::BlueChip),
    ("eth", "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee", TokenClass::BlueChip),
    ("steth", "0xae7ab96520de3a18e5e111b5eaab095312d7fe84", TokenClass::BlueChip),
    ("wsteth", "0x7f39c581f595b53c5cb19bd0b3f8da6c935e2ca0", TokenClass::BlueChip),
    ("eigen", "0xec53bf9167f50cdeb3ae105f56099aaab9061f83", TokenClass::BlueChip),
    ("link", "0x514910771af9ca656af840dff83e8264ecf986ca", TokenClass::BlueChip),
    ("ena", "0x57e114b691db790c35207b2e685d4a43181e6061", TokenClass::BlueChip),
    ("cow", "0xdef1ca1fb7fbcdc777520aa7f396b4e015f497ab", TokenClass::BlueChip),
    ("uni", "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", TokenClass::BlueChip),
    ("aave", "0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9", TokenClass::BlueChip),
    ("pepe", "0x6982508145454ce325ddbe47a25d4ec3d2311933", TokenClass::Meme),
    ("spx", "0xe0f63a424a4439cbe457d80e4f4b51ad25b2c56c", TokenClass::Meme),
    ("shib", "0x95ad61b0a150d79219dcf64e1e6cc01f0b64c4ce", TokenClass::Meme),
    ("doge", "0x1121acc14c63f3c872bfca497d10926a6098aac5", TokenClass::Meme),
];

const ARBITRUM_TOKENS: &[TokenRow] = &[
    ("usdc", "0xaf88d065e77c8cc2239327c5edb3a432268e5831", TokenClass::Stable),
    ("usdt", "0xfd086bc7cd5c481dcc9c85ebe478a1c0b69fcbb9", TokenClass::Stable),
    ("usde", "0x5d3a1ff2b6bab83b63cd9ad0787074081a52ef34", TokenClass::Stable),
    ("dai", "0xda10009cbd5d07dd0cecc66161fc93d7c9000da1", TokenClass::Stable),
    ("weth", "0x82af49447d8a07e3bd95bd0d56f35241523fbab1", TokenClass::BlueChip),
    ("wbtc", "0x2f2a2543b76a4166549f7aab2e75bef0aefc5b0f", TokenClass::BlueChip),
    ("arb", "0x912ce59144191c1204e64559fe8253a0e49e6548", TokenClass::BlueChip),
    ("eth", "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee", TokenClass::BlueChip),
    ("weeth", "0x35751007a407ca6feffe80b3cb397736d2cf4dbe", TokenClass::BlueChip),
    ("wsteth", "0x5979d7b546e38e414f7e9822514be443a4800529", TokenClass::BlueChip),
    ("link", "0xf97f4df75117a78c1a5a0dbb814af92458539fb4", TokenClass::BlueChip),
    ("zro", "0x6985884c4392d348587b19cb9eaaf157f13271cd", TokenClass::BlueChip),
    ("aave", "0xba5ddd1f9d7f570dc94a51479a000e3bce967196", TokenClass::BlueChip),
    ("uni", "0xfa7f8980b0f1e64a2062791cc3b0871572f1f7f0", TokenClass::BlueChip),
    ("pendle", "0x0c880f6761f1af8d9aa9c466984b80dab9a8c9e8", TokenClass::BlueChip),
    ("gmx", "0xfc5a1a6eb076a2c7ad06ed22c90d7e710e35ad0a", TokenClass::BlueChip),
    ("magic", "0x539bde0d7dbd336b79148aa742883198bbf60342", TokenClass::BlueChip),
    ("ape", "0x7f9fbf9bdd3f4105c478b996b648fe6e828a1e98", TokenClass::Meme),
    ("pepe", "0x25d887ce7a35172c62febfd67a1856f20faebb00", TokenClass::Meme),
];

const ETHEREUM_DEFAULT_PAIRS: &[(TokenClass, &[(&str, &str)])] = &[
    (
        TokenClass::Stable,
        &[("usdc", "usdt"), ("dai", "usdc"), ("dai", "usdt"), ("weth", "wsteth")],
    ),
    (
        TokenClass::BlueChip,
        &[
            ("weth", "usdt"),
            ("usdc", "weth"),
            ("dai", "weth"),
            ("wbtc", "weth"),
            ("wbtc", "usdt"),
            ("link", "weth"),
            ("aave", "weth"),
            ("uni", "weth"),
            ("weth", "eigen"),
        ],
    ),
    (
        TokenClass::Meme,
        &[("doge", "weth"), ("shib", "weth"), ("pepe", "weth"), ("spx", "weth")],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub symbol: String,
    pub address: String,
    pub class: TokenClass,
}

/// A (base, quote) address pair from the built-in defaults
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultPair {
    pub class: TokenClass,
    pub base: String,
    pub quote: String,
}

/// Symbol and address lookup for one chain.
///
/// Symbols and addresses are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    chain: Chain,
    tokens: Vec<TokenInfo>,
    by_symbol: HashMap<String, usize>,
    by_address: HashMap<String, usize>,
}

impl TokenRegistry {
    pub fn new(chain: Chain) -> Self {
        let rows = match chain {
            Chain::Ethereum => ETHEREUM_TOKENS,
            Chain::Arbitrum => ARBITRUM_TOKENS,
        };

        let tokens: Vec<TokenInfo> = rows
            .iter()
            .map(|&(symbol, address, class)| TokenInfo {
                symbol: symbol.to_string(),
                address: address.to_string(),
                class,
            })
            .collect();

        let by_symbol = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.symbol.clone(), i))
            .collect();
        let by_address = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.address.clone(), i))
            .collect();

        Self {
            chain,
            tokens,
            by_symbol,
            by_address,
        }
    }

    pub fn for_chain(name: &str) -> AnalysisResult<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn tokens(&self) -> &[TokenInfo] {
        &self.tokens
    }

    pub fn address(&self, symbol: &str) -> AnalysisResult<&str> {
        self.by_symbol
            .get(&symbol.to_lowercase())
            .map(|&i| self.tokens[i].address.as_str())
            .ok_or_else(|| AnalysisError::UnknownToken(symbol.to_string()))
    }

    pub fn symbol(&self, address: &str) -> AnalysisResult<&str> {
        self.by_address
            .get(&address.to_lowercase())
            .map(|&i| self.tokens[i].symbol.as_str())
            .ok_or_else(|| AnalysisError::UnknownToken(address.to_string()))
    }

    /// Address for a symbol, or the lowercased address itself when one is given
    pub fn resolve(&self, token: &str) -> AnalysisResult<String> {
        if token.starts_with("0x") {
            let address = token.to_lowercase();
            if self.by_address.contains_key(&address) {
                return Ok(address);
            }
            return Err(AnalysisError::UnknownToken(token.to_string()));
        }
        self.address(token).map(str::to_string)
    }

    /// Address → uppercase symbol, as used for pair labels
    pub fn symbol_lookup(&self) -> HashMap<String, String> {
        self.tokens
            .iter()
            .map(|t| (t.address.clone(), t.symbol.to_uppercase()))
            .collect()
    }

    /// Default analysis pairs; empty for chains without a curated list
    pub fn default_pairs(&self) -> AnalysisResult<Vec<DefaultPair>> {
        let groups = match self.chain {
            Chain::Ethereum => ETHEREUM_DEFAULT_PAIRS,
            Chain::Arbitrum => &[],
        };

        let mut pairs = Vec::new();
        for &(class, group) in groups {
            for &(base, quote) in group {
                pairs.push(DefaultPair {
                    class,
                    base: self.address(base)?.to_string(),
                    quote: self.address(quote)?.to_string(),
                });
            }
        }
        Ok(pairs)
    }
}
