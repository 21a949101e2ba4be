//! Oracle contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings. Only the
//! constructors and methods the deployer and handles use are declared; the
//! creation bytecode comes from [`crate::artifacts`].

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// ERC-677 fee token
    #[derive(Debug)]
    #[sol(rpc)]
    contract LinkToken {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function transferAndCall(address to, uint256 value, bytes data) external returns (bool);
        function approve(address spender, uint256 value) external returns (bool);
    }

    /// Flux Monitor price aggregator
    #[derive(Debug)]
    #[sol(rpc)]
    contract FluxAggregator {
        constructor(
            address link,
            uint128 paymentAmount,
            uint32 timeout,
            address validator,
            int256 minSubmissionValue,
            int256 maxSubmissionValue,
            uint8 decimals,
            string description
        );

        function updateAvailableFunds() external;
        function availableFunds() external view returns (uint128);
        function paymentAmount() external view returns (uint128);
        function description() external view returns (string);
        function getOracles() external view returns (address[]);
        function changeOracles(
            address[] removed,
            address[] added,
            address[] addedAdmins,
            uint32 minSubmissions,
            uint32 maxSubmissions,
            uint32 restartDelay
        ) external;
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }

    /// Off-chain reporting aggregator
    #[derive(Debug)]
    #[sol(rpc)]
    contract OffchainAggregator {
        constructor(
            uint32 maximumGasPrice,
            uint32 reasonableGasPrice,
            uint32 microLinkPerEth,
            uint32 linkGweiPerObservation,
            uint32 linkGweiPerTransmission,
            address link,
            int192 minAnswer,
            int192 maxAnswer,
            address billingAccessController,
            address requesterAccessController,
            uint8 decimals,
            string description
        );

        function setConfig(
            address[] signers,
            address[] transmitters,
            uint8 threshold,
            uint64 encodedConfigVersion,
            bytes encoded
        ) external;
        function setPayees(address[] transmitters, address[] payees) external;
        function latestConfigDetails() external view returns (
            uint32 configCount,
            uint32 blockNumber,
            bytes16 configDigest
        );
        function getLinkToken() external view returns (address);
        function transmitters() external view returns (address[]);
        function latestAnswer() external view returns (int256);
        function latestRound() external view returns (uint256);
        function description() external view returns (string);
    }

    /// Single-slot value store
    #[derive(Debug)]
    #[sol(rpc)]
    contract Store {
        function set(uint256 value) external;
        function get() external view returns (uint256);
    }

    /// VRF proof verification helper
    #[derive(Debug)]
    #[sol(rpc)]
    contract VRF {
        function randomValueFromVRFProof(bytes proof) external view returns (uint256);
    }
}
