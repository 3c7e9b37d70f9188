use alloy::json_abi::JsonAbi;
use contractscope_core::models::TokenType;

/// Placeholder Etherscan returns in the `ABI` field of unverified contracts.
pub const UNVERIFIED_ABI: &str = "Contract source code not verified";

/// Classify a contract from its verified ABI JSON.
///
/// `ownerOf` marks an ERC-721; `transfer` together with `balanceOf` marks an
/// ERC-20. Anything else, including an ABI that fails to parse, is a plain
/// contract.
pub fn classify_abi(abi: &str) -> TokenType {
    if abi == UNVERIFIED_ABI {
        return TokenType::Contract;
    }

    let names = match abi_member_names(abi) {
        Some(names) => names,
        None => {
            tracing::debug!("Could not parse ABI, classifying as plain contract");
            return TokenType::Contract;
        }
    };
    let has = |name: &str| names.iter().any(|n| n == name);

    if has("ownerOf") {
        TokenType::Erc721
    } else if has("transfer") && has("balanceOf") {
        TokenType::Erc20
    } else {
        TokenType::Contract
    }
}

/// Names of every ABI entry. Falls back to a loose JSON scan for ABIs that
/// the typed parser rejects.
fn abi_member_names(abi: &str) -> Option<Vec<String>> {
    if let Ok(parsed) = serde_json::from_str::<JsonAbi>(abi) {
        let mut names: Vec<String> = parsed.functions.keys().cloned().collect();
        names.extend(parsed.events.keys().cloned());
        names.extend(parsed.errors.keys().cloned());
        return Some(names);
    }

    let value: serde_json::Value = serde_json::from_str(abi).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.get("name")?.as_str().map(str::to_owned))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"transfer","stateMutability":"nonpayable","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
        {"type":"event","name":"Transfer","anonymous":false,"inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}]}
    ]"#;

    const ERC721_ABI: &str = r#"[
        {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"ownerOf","stateMutability":"view","inputs":[{"name":"tokenId","type":"uint256"}],"outputs":[{"name":"","type":"address"}]}
    ]"#;

    #[test]
    fn detects_erc20() {
        assert_eq!(classify_abi(ERC20_ABI), TokenType::Erc20);
    }

    #[test]
    fn owner_of_wins_over_erc20_members() {
        assert_eq!(classify_abi(ERC721_ABI), TokenType::Erc721);
    }

    #[test]
    fn transfer_without_balance_of_is_a_contract() {
        let abi = r#"[{"type":"function","name":"transfer","stateMutability":"nonpayable","inputs":[],"outputs":[]}]"#;
        assert_eq!(classify_abi(abi), TokenType::Contract);
    }

    #[test]
    fn unverified_and_garbage_are_contracts() {
        assert_eq!(classify_abi(UNVERIFIED_ABI), TokenType::Contract);
        assert_eq!(classify_abi("{not json"), TokenType::Contract);
        assert_eq!(classify_abi(r#"{"name":"ownerOf"}"#), TokenType::Contract);
    }

    #[test]
    fn loose_scan_handles_nonstandard_entries() {
        let abi = r#"[{"name":"ownerOf","type":"mystery"}]"#;
        assert_eq!(classify_abi(abi), TokenType::Erc721);
    }
}
