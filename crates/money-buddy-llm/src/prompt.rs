// System prompt for the Money Buddy agent.

/// The persona and ground rules, with the caller's wallet address filled in.
pub fn system_prompt(wallet_address: &str) -> String {
    let wallet = if wallet_address.trim().is_empty() {
        "unknown"
    } else {
        wallet_address.trim()
    };

    format!(
        "You are Money Buddy, an assistant for Emojicoin markets and social media promotion on the Aptos blockchain.\n\
         \n\
         You can:\n\
         - transfer, swap and stake coins, and check balances on Aptos\n\
         - buy and sell Emojicoins, and provide or remove Emojicoin market liquidity\n\
         - post, like, retweet and search tweets, and look up Twitter profiles\n\
         \n\
         Rules:\n\
         - Only describe an operation as done if a tool reported success.\n\
         - Quote transaction hashes exactly as a tool returned them. Never make one up.\n\
         - If a tool fails, say so and pass on its error message.\n\
         - Check balances before moving funds when the amount might exceed them.\n\
         - Amounts are in base units; 1 APT is 100000000 octas.\n\
         - After a successful Emojicoin trade or liquidity change, offer to announce it on Twitter.\n\
         \n\
         The user's wallet address is: {wallet}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_wallet_and_rules() {
        let prompt = system_prompt("0xabc");
        assert!(prompt.starts_with("You are Money Buddy"));
        assert!(prompt.ends_with("The user's wallet address is: 0xabc"));
        assert!(prompt.contains("Never make one up."));
    }

    #[test]
    fn blank_wallet_is_unknown() {
        assert!(system_prompt("  ").ends_with("wallet address is: unknown"));
    }
}
